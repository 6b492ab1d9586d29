// crates/pf_mpfa/src/schemes/l_method.rs

//! L 方法
//!
//! O 方法模板在强扭曲/强各向异性网格上可能失去单调性；L 方法把
//! 每条连接的模板限制在锚定于单一"主单元"的更小区域内。
//!
//! 每条连接在每个内部顶点处：主单元必须在该顶点恰有 3 个界面。
//! here/there 两侧都合格时构建两个候选区域（各取一侧为主单元），
//! 仅一侧合格时构建一个，两侧均不合格属非法局部拓扑。区域 =
//! 主单元（3 个界面、3 个"次级"相邻单元，各一个界面）。
//!
//! 矩阵装配中主单元只进通量连续性行 (A, B)，无独立通量表达项；
//! 每个次级单元进全部四个矩阵，其"完全势连续"通过把主单元基函数
//! 在顶点与一个半边中点的取值代入（而非引入独立未知量）实现。
//! 这一代换是 L 方法的定义性特征。
//!
//! 两个候选都存在时各解一次 T，取对侧单元系数模更小者，近似
//! 判断哪个选择更好地隔离了类两点的主导项。
//!
//! 边界连接统一回退到顶点子面面积的两点计算（跨边界不存在内部
//! L 区域）。

use pf_foundation::prelude::*;
use pf_mesh::Mesh;

use crate::basis::{cardinal_bases, ElementField, LinearForm};
use crate::conductivity::Conductivity;
use crate::config::MpfaConfig;
use crate::geometry::{directional_conductivity, half_edge_points, sub_face_normal_area};
use crate::region::{schur_reduce, InteractionRegion, RegionMatrices};
use crate::transmissibility::{ConnectionStencil, TransmissibilityTable};

use super::{
    boundary_vertex_contribution, sweep_vertices, TransmissibilityScheme, VertexContribution,
};

/// L 方法格式
#[derive(Debug, Clone)]
pub struct LMethodScheme {
    parallel: bool,
    parallel_threshold: usize,
    check_row_sums: bool,
}

impl LMethodScheme {
    /// 以默认配置创建
    pub fn new() -> Self {
        Self::from_config(&MpfaConfig::default())
    }

    /// 从配置创建
    pub fn from_config(config: &MpfaConfig) -> Self {
        Self {
            parallel: config.parallel,
            parallel_threshold: config.parallel_threshold,
            check_row_sums: config.check_row_sums,
        }
    }
}

impl Default for LMethodScheme {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmissibilityScheme for LMethodScheme {
    fn name(&self) -> &'static str {
        "L_MPFA"
    }

    fn compute_all(
        &self,
        mesh: &Mesh,
        conductivity: &dyn Conductivity,
    ) -> PfResult<TransmissibilityTable> {
        sweep_vertices(mesh, self.parallel, self.parallel_threshold, |point| {
            if mesh.point_is_boundary(point) {
                boundary_vertex_contribution(mesh, conductivity, point)
            } else {
                interior_vertex_contribution(
                    mesh,
                    conductivity,
                    point,
                    self.check_row_sums,
                )
            }
        })
    }
}

fn interior_vertex_contribution(
    mesh: &Mesh,
    conductivity: &dyn Conductivity,
    point: usize,
    check_row_sums: bool,
) -> PfResult<VertexContribution> {
    let mut out = Vec::new();
    for connection in mesh.connections_at_point(point) {
        let stencil = best_l_stencil(mesh, conductivity, point, connection)?;
        if check_row_sums {
            let row_sum = stencil.row_sum();
            if row_sum.abs() > ROW_SUM_TOLERANCE {
                tracing::warn!(
                    connection,
                    point,
                    row_sum,
                    "L 区域模板行和偏离零"
                );
            }
        }
        out.push((connection, stencil));
    }
    Ok(out)
}

/// 连接在该顶点的最优 L 候选
fn best_l_stencil(
    mesh: &Mesh,
    conductivity: &dyn Conductivity,
    point: usize,
    connection: usize,
) -> PfResult<ConnectionStencil> {
    let conn = mesh.connection(connection);
    // 显式 (选择度量, 模板) 候选表，按索引选取
    let mut candidates: Vec<(Scalar, ConnectionStencil)> = Vec::with_capacity(2);

    for primary in [conn.element_here, conn.element_there] {
        if primary_interfaces(mesh, point, primary).is_some() {
            let stencil = l_region_stencil(mesh, conductivity, point, connection, primary)?;
            let other = conn.other_element(primary);
            candidates.push((stencil.coefficient(other).abs(), stencil));
        }
    }

    select_candidate(point, candidates)
}

/// 从候选表中按最小选择度量取模板
pub(crate) fn select_candidate(
    point: usize,
    candidates: Vec<(Scalar, ConnectionStencil)>,
) -> PfResult<ConnectionStencil> {
    let mut best: Option<(Scalar, ConnectionStencil)> = None;
    for (measure, stencil) in candidates {
        match &best {
            Some((best_measure, _)) if *best_measure <= measure => {}
            _ => best = Some((measure, stencil)),
        }
    }
    best.map(|(_, stencil)| stencil).ok_or_else(|| {
        PfError::unsupported_topology(point, "连接两侧均无合法主单元（顶点度 3 检验失败）")
    })
}

/// 主单元合格性检验：在顶点处恰有 3 个界面且全部为内部界面
///
/// 返回该单元在顶点处的 3 个界面。
pub(crate) fn primary_interfaces(
    mesh: &Mesh,
    point: usize,
    element: usize,
) -> Option<[usize; 3]> {
    let ifaces = mesh.element_interfaces_at_point(element, point);
    if ifaces.len() != 3 {
        return None;
    }
    if ifaces
        .iter()
        .any(|&f| mesh.interface(f).connection.is_none())
    {
        return None;
    }
    Some([ifaces[0], ifaces[1], ifaces[2]])
}

/// 以给定主单元装配 L 区域并提取目标连接的 here 向模板行
pub(crate) fn l_region_stencil(
    mesh: &Mesh,
    conductivity: &dyn Conductivity,
    point: usize,
    target_connection: usize,
    primary: usize,
) -> PfResult<ConnectionStencil> {
    let ifaces = primary_interfaces(mesh, point, primary).ok_or_else(|| {
        PfError::unsupported_topology(point, format!("单元 {primary} 不满足主单元条件"))
    })?;
    let vertex = mesh.point_coord(point);

    // 局部编号：主单元 0，次级单元按界面序
    let mut region = InteractionRegion::new(point);
    region.add_element(primary);
    let mut connections = [0usize; 3];
    let mut secondaries = [0usize; 3];
    for (slot, &iface) in ifaces.iter().enumerate() {
        let connection = mesh.interface(iface).connection.ok_or_else(|| {
            PfError::internal(format!("主单元界面 {iface} 无连接"))
        })?;
        connections[slot] = connection;
        let secondary = mesh.connection(connection).other_element(primary);
        secondaries[slot] = secondary;
        region.add_element(secondary);
        region.add_connection(connection);
        // 主单元局部索引恒为 0
        region.push_interface(0, iface);
    }
    let n_cells = region.num_elements();
    let n_conns = 3;

    // 主单元基：单元中心 + 3 个界面中心
    let mut prim_points = Vec::with_capacity(4);
    prim_points.push(mesh.element(primary).center);
    for &iface in &ifaces {
        prim_points.push(mesh.interface(iface).center);
    }
    let prim_bases = cardinal_bases(primary, &prim_points)?;
    let prim_forms = vec![
        LinearForm::cell(n_cells, n_conns, 0),
        LinearForm::conn(n_cells, n_conns, 0),
        LinearForm::conn(n_cells, n_conns, 1),
        LinearForm::conn(n_cells, n_conns, 2),
    ];
    let prim_field = ElementField::new(prim_bases, prim_forms);
    let prim_tensor = conductivity.tensor(primary);

    let mut matrices = RegionMatrices::zeros(n_conns, n_cells);

    for slot in 0..3 {
        let iface = ifaces[slot];
        let connection = connections[slot];
        let secondary = secondaries[slot];
        let sec_local = region.element_index(secondary).ok_or_else(|| {
            PfError::internal(format!("次级单元 {secondary} 未登记"))
        })?;
        let sec_iface = mesh.neighbour_interface(iface).ok_or_else(|| {
            PfError::internal(format!("界面 {iface} 无镜像界面"))
        })?;

        // 次级单元基：中心 + 共享连续性点 + 顶点 + 半边中点，
        // 后两者的势由主单元场代入（完全势连续）
        let (half_edge, _) = half_edge_points(mesh, iface, point)?;
        let sec_points = [
            mesh.element(secondary).center,
            mesh.interface(iface).center,
            vertex,
            half_edge,
        ];
        let sec_bases = cardinal_bases(secondary, &sec_points)?;
        let sec_forms = vec![
            LinearForm::cell(n_cells, n_conns, sec_local),
            LinearForm::conn(n_cells, n_conns, slot),
            prim_field.value_form(vertex),
            prim_field.value_form(half_edge),
        ];
        let sec_field = ElementField::new(sec_bases, sec_forms);

        let omega_prim = directional_conductivity(
            &prim_tensor,
            sub_face_normal_area(mesh, iface, point)?,
        );
        let flux_prim = prim_field.flux_form(omega_prim);

        let omega_sec = directional_conductivity(
            &conductivity.tensor(secondary),
            sub_face_normal_area(mesh, sec_iface, point)?,
        );
        let flux_sec = sec_field.flux_form(omega_sec);

        // 通量连续性行：两侧外向通量之和为零
        for m in 0..n_conns {
            matrices.a[(slot, m)] += flux_prim.conns[m] + flux_sec.conns[m];
            matrices.c[(slot, m)] += flux_sec.conns[m];
        }
        for i in 0..n_cells {
            matrices.b[(slot, i)] -= flux_prim.cells[i] + flux_sec.cells[i];
            matrices.d[(slot, i)] -= flux_sec.cells[i];
        }

        // 目标连接的局部行号即 slot（连接按界面序登记）
        debug_assert_eq!(region.connection_index(connection), Some(slot));
    }

    let row = region.connection_index(target_connection).ok_or_else(|| {
        PfError::internal(format!("目标连接 {target_connection} 不在 L 区域中"))
    })?;
    let t = schur_reduce(point, &matrices)?;

    // 通量表达取自次级侧（主单元无通量表达项）：
    // 主单元为连接 here 侧时，次级侧外向通量与 here 向通量反号
    let sign = if mesh.connection(target_connection).element_here == primary {
        -1.0
    } else {
        1.0
    };

    let mut stencil = ConnectionStencil::new();
    for (local_el, &element) in region.elements().iter().enumerate() {
        let value = sign * t[(row, local_el)];
        if value != 0.0 {
            stencil.add(element, value);
        }
    }
    Ok(stencil)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductivity::UniformConductivity;
    use pf_mesh::CartesianMeshBuilder;

    fn center_vertex(mesh: &Mesh) -> usize {
        (0..mesh.n_points())
            .find(|&p| !mesh.point_is_boundary(p))
            .expect("需要内部顶点")
    }

    #[test]
    fn test_primary_qualifies_on_hex_grid() {
        let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
        let point = center_vertex(&mesh);
        // 中心顶点处每个单元都恰有 3 个界面
        for &element in mesh.point_elements(point) {
            assert!(primary_interfaces(&mesh, point, element).is_some());
        }
    }

    #[test]
    fn test_cartesian_two_point_stencil() {
        let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
        let k = UniformConductivity::isotropic(1.0);
        let point = center_vertex(&mesh);

        for connection in mesh.connections_at_point(point) {
            let conn = mesh.connection(connection);
            let stencil =
                best_l_stencil(&mesh, &k, point, connection).unwrap();

            // 正交均质网格: 子面两点系数 ±0.25, 次级交叉项消失
            assert!(
                (stencil.coefficient(conn.element_here) - 0.25).abs() < 1e-10,
                "here 系数: {}",
                stencil.coefficient(conn.element_here)
            );
            assert!((stencil.coefficient(conn.element_there) + 0.25).abs() < 1e-10);
            assert!(stencil.row_sum().abs() < 1e-10);
        }
    }

    #[test]
    fn test_both_candidates_agree_on_symmetric_grid() {
        // 对称网格上两个候选给出相同模板
        let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
        let k = UniformConductivity::isotropic(2.0);
        let point = center_vertex(&mesh);
        let connection = mesh.connections_at_point(point)[0];
        let conn = mesh.connection(connection);

        let here_primary =
            l_region_stencil(&mesh, &k, point, connection, conn.element_here).unwrap();
        let there_primary =
            l_region_stencil(&mesh, &k, point, connection, conn.element_there).unwrap();

        for entry in here_primary.entries() {
            assert!(
                (entry.value - there_primary.coefficient(entry.element)).abs() < 1e-10
            );
        }
    }

    #[test]
    fn test_full_scheme_conservation() {
        let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
        let k = UniformConductivity::isotropic(1.0);
        let table = LMethodScheme::new().compute_all(&mesh, &k).unwrap();

        for stencil in table.stencils() {
            assert!(stencil.row_sum().abs() < 1e-10);
        }
    }
}
