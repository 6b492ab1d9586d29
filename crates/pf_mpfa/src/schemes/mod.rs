// crates/pf_mpfa/src/schemes/mod.rs

//! 传导率格式
//!
//! 四种离散化共享一个抽象计算契约 [`TransmissibilityScheme`]，
//! 由配置驱动的工厂 [`create_scheme`] 选择，不做子类运行时类型
//! 判断。
//!
//! O / L / L4 共用顶点扫描编排：逐网格顶点分类边界/内部，边界
//! 顶点统一走两点子面回退，内部顶点走格式各自的区域装配。扫描
//! 按顶点数据并行（rayon，带阈值），顶点间无顺序依赖；部分结果
//! 串行合并到按连接的输出表，首个几何/拓扑错误中止整次计算。

pub mod l4_method;
pub mod l_method;
pub mod o_method;
pub mod tpfa;

pub use l4_method::L4MethodScheme;
pub use l_method::LMethodScheme;
pub use o_method::OMethodScheme;
pub use tpfa::TpfaScheme;

use pf_foundation::prelude::*;
use pf_mesh::Mesh;
use rayon::prelude::*;

use crate::conductivity::Conductivity;
use crate::config::{MpfaConfig, SchemeKind};
use crate::geometry::sub_face_area;
use crate::transmissibility::{ConnectionStencil, TransmissibilityTable};

/// 传导率格式的抽象计算契约
pub trait TransmissibilityScheme: Sync {
    /// 格式名称
    fn name(&self) -> &'static str;

    /// 计算全网格的按连接模板表
    fn compute_all(
        &self,
        mesh: &Mesh,
        conductivity: &dyn Conductivity,
    ) -> PfResult<TransmissibilityTable>;
}

/// 配置驱动的格式工厂
pub fn create_scheme(config: &MpfaConfig) -> PfResult<Box<dyn TransmissibilityScheme>> {
    config.validate()?;
    Ok(match config.scheme {
        SchemeKind::Tpfa => Box::new(TpfaScheme::new()),
        SchemeKind::OMethod => Box::new(OMethodScheme::from_config(config)),
        SchemeKind::LMethod => Box::new(LMethodScheme::from_config(config)),
        SchemeKind::L4Method => Box::new(L4MethodScheme::from_config(config)),
    })
}

// ============================================================
// 共享顶点扫描
// ============================================================

/// 单个顶点产出的按连接部分模板
pub(crate) type VertexContribution = Vec<(usize, ConnectionStencil)>;

/// 顶点扫描：逐顶点求值并合并到按连接的输出表
///
/// 顶点间无共享可变状态；并行分支收集部分结果后串行合并，
/// 首个错误中止整次计算。
pub(crate) fn sweep_vertices<F>(
    mesh: &Mesh,
    parallel: bool,
    parallel_threshold: usize,
    per_vertex: F,
) -> PfResult<TransmissibilityTable>
where
    F: Fn(usize) -> PfResult<VertexContribution> + Send + Sync,
{
    let n_points = mesh.n_points();
    let contributions: Vec<VertexContribution> =
        if parallel && n_points >= parallel_threshold {
            (0..n_points)
                .into_par_iter()
                .map(per_vertex)
                .collect::<PfResult<_>>()?
        } else {
            (0..n_points).map(per_vertex).collect::<PfResult<_>>()?
        };

    let mut table = TransmissibilityTable::new(mesh.n_connections());
    for vertex_contribution in contributions {
        for (connection, partial) in vertex_contribution {
            table.stencil_mut(connection).merge(&partial);
        }
    }
    Ok(table)
}

/// 边界顶点回退：对触及顶点的每条连接做两点子面计算
///
/// 跨边界不存在内部交互区域，用该顶点处的子面面积（而非整面
/// 面积）做两点公式；一个界面各角点的子面面积之和即整面面积，
/// 因此跨顶点累积后与全面积两点公式一致。
pub(crate) fn boundary_vertex_contribution(
    mesh: &Mesh,
    conductivity: &dyn Conductivity,
    point: usize,
) -> PfResult<VertexContribution> {
    let mut out = Vec::new();
    for connection in mesh.connections_at_point(point) {
        let conn = mesh.connection(connection);
        let area = sub_face_area(mesh, conn.here, point)?;
        let t = tpfa::two_point_coefficient(mesh, conductivity, connection, area);

        let mut stencil = ConnectionStencil::new();
        stencil.add(conn.element_here, t);
        stencil.add(conn.element_there, -t);
        out.push((connection, stencil));
    }
    Ok(out)
}
