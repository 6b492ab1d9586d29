// crates/pf_mpfa/src/schemes/tpfa.rs

//! 两点通量逼近 (TPFA)
//!
//! 直接的调和平均式公式：对每条相邻连接，取两侧 ‖K·n‖ 模长与
//! 单元中心到界面中心的距离，
//!
//! ```text
//! t = (Ki·n)(Kj·n)·A / [ (Kj·n)·d_i + (Kj·n)·d_j ]
//! ```
//!
//! 任一侧 ‖K·n‖ = 0 时系数取零（非活动单元），不报错。
//!
//! 注意：分母两项均取 there 侧模长。该不对称是有意保留的行为
//! （见 DESIGN.md），均质场下与教科书调和平均一致。
//!
//! 每条连接恰好产出两个条目，here 侧为正、there 侧为负。

use pf_foundation::prelude::*;
use pf_foundation::scalar::CONDUCTIVITY_EPSILON;
use pf_mesh::Mesh;

use crate::conductivity::Conductivity;
use crate::transmissibility::TransmissibilityTable;

use super::TransmissibilityScheme;

/// 两点格式
///
/// 基线格式；亦是 O/L/L4 在边界顶点的强制回退（子面面积版本，
/// 见 [`super::boundary_vertex_contribution`]）。
#[derive(Debug, Clone, Copy, Default)]
pub struct TpfaScheme;

impl TpfaScheme {
    /// 创建两点格式
    pub fn new() -> Self {
        Self
    }
}

impl TransmissibilityScheme for TpfaScheme {
    fn name(&self) -> &'static str {
        "TPFA"
    }

    fn compute_all(
        &self,
        mesh: &Mesh,
        conductivity: &dyn Conductivity,
    ) -> PfResult<TransmissibilityTable> {
        let mut table = TransmissibilityTable::new(mesh.n_connections());
        for (ci, conn) in mesh.connections().iter().enumerate() {
            let area = mesh.interface(conn.here).area;
            let t = two_point_coefficient(mesh, conductivity, ci, area);

            let stencil = table.stencil_mut(ci);
            stencil.add(conn.element_here, t);
            stencil.add(conn.element_there, -t);
        }
        Ok(table)
    }
}

/// 两点传导率系数
///
/// `area` 由调用方给定：整面面积（TPFA 本体）或顶点子面面积
/// （MPFA 边界回退）。
pub(crate) fn two_point_coefficient(
    mesh: &Mesh,
    conductivity: &dyn Conductivity,
    connection: usize,
    area: Scalar,
) -> Scalar {
    let conn = mesh.connection(connection);
    let here = mesh.interface(conn.here);
    let there = mesh.interface(conn.there);

    let ki_n = (conductivity.tensor(conn.element_here) * here.normal).length();
    let kj_n = (conductivity.tensor(conn.element_there) * here.normal).length();
    if ki_n < CONDUCTIVITY_EPSILON || kj_n < CONDUCTIVITY_EPSILON {
        return 0.0;
    }

    let d_i = (mesh.element(conn.element_here).center - here.center).length();
    let d_j = (mesh.element(conn.element_there).center - there.center).length();

    // 分母两项均取 there 侧模长（有意保留的不对称，见 DESIGN.md）
    let denominator = kj_n * d_i + kj_n * d_j;
    if denominator < DISTANCE_EPSILON {
        // 单元中心落在界面上的退化网格
        return 0.0;
    }

    ki_n * kj_n * area / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductivity::{ElementConductivity, UniformConductivity, isotropic_tensor};
    use glam::DMat3;
    use pf_mesh::CartesianMeshBuilder;

    fn two_cell_mesh() -> Mesh {
        CartesianMeshBuilder::new(2, 1, 1).build().unwrap()
    }

    #[test]
    fn test_sample_scenario() {
        // 2×1×1 单位立方双单元、各向同性单位传导率:
        // ‖K·n‖ = 1, A = 1, d_i = d_j = 0.5 → t = 1.0
        let mesh = two_cell_mesh();
        let k = UniformConductivity::isotropic(1.0);
        let table = TpfaScheme::new().compute_all(&mesh, &k).unwrap();

        let stencil = table.stencil(0);
        assert_eq!(stencil.len(), 2);
        let conn = mesh.connection(0);
        assert!((stencil.coefficient(conn.element_here) - 1.0).abs() < 1e-12);
        assert!((stencil.coefficient(conn.element_there) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetry() {
        // 两个条目等模反号
        let mesh = two_cell_mesh();
        let k = UniformConductivity::isotropic(3.7);
        let table = TpfaScheme::new().compute_all(&mesh, &k).unwrap();

        let entries = table.stencil(0).entries();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].value + entries[1].value).abs() < 1e-12);
    }

    #[test]
    fn test_zero_conductivity_inactive() {
        let mesh = two_cell_mesh();
        let k = UniformConductivity::new(DMat3::ZERO);
        let table = TpfaScheme::new().compute_all(&mesh, &k).unwrap();

        assert_eq!(table.stencil(0).coefficient(0), 0.0);
        assert_eq!(table.stencil(0).coefficient(1), 0.0);
    }

    #[test]
    fn test_there_magnitude_asymmetry_preserved() {
        // 异质场下实现公式与教科书调和平均不同：
        // 实现:   t = ki·kj·A / (kj·d_i + kj·d_j)
        // 教科书: t = ki·kj·A / (kj·d_i + ki·d_j)（等价 A/(d_i/ki + d_j/kj)）
        let mesh = two_cell_mesh();
        let k = ElementConductivity::new(vec![isotropic_tensor(1.0), isotropic_tensor(4.0)]);
        let table = TpfaScheme::new().compute_all(&mesh, &k).unwrap();

        let conn = mesh.connection(0);
        let t = table.stencil(0).coefficient(conn.element_here);

        // 实现: 1·4·1 / (4·0.5 + 4·0.5) = 1.0
        assert!((t - 1.0).abs() < 1e-12);
        // 教科书: 1 / (0.5/1 + 0.5/4) = 1.6，二者确实不同
        let textbook = 1.0 / (0.5 / 1.0 + 0.5 / 4.0);
        assert!((t - textbook).abs() > 0.5);
    }

    #[test]
    fn test_homogeneous_matches_textbook() {
        // 均质场下不对称无影响
        let mesh = two_cell_mesh();
        let k = UniformConductivity::isotropic(2.0);
        let table = TpfaScheme::new().compute_all(&mesh, &k).unwrap();

        let conn = mesh.connection(0);
        let textbook = 1.0 / (0.5 / 2.0 + 0.5 / 2.0);
        assert!((table.stencil(0).coefficient(conn.element_here) - textbook).abs() < 1e-12);
    }
}
