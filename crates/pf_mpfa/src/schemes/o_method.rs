// crates/pf_mpfa/src/schemes/o_method.rs

//! 广义 O 方法
//!
//! 每个内部网格顶点一个交互区域，覆盖触及该顶点的全部单元与
//! 界面。连续性自由度按连接编号：共享一条相邻连接的两个界面
//! 取同一局部索引。
//!
//! 连续性参数 η ∈ (0,1] 把连续性点在界面中心 (η=1，默认) 与顶点
//! (η→0) 之间插值，以精度换取扭曲网格上的健壮性。
//!
//! 每个单元以 单元中心 + 各关联连续性点 解 3×3 / 4×4 系统（二维/
//! 三维情形）得基数基 ψ₀（单元中心支撑）与 ψ₁..ψₙ（连续性点
//! 支撑）。装配时对每个单元的每个区域界面取
//! `f = 方向传导率 · ∇ψⱼ`，连续性势列加 `f` 入 A、单元势列加
//! `-f` 入 B；界面位于连接 here 侧时同样累入 C/D，保证整个区域
//! 的通量符号约定一致。每顶点解一次 T，行散布到触及该顶点的
//! 每条连接，同单元贡献合并。

use pf_foundation::prelude::*;
use pf_mesh::Mesh;

use crate::basis::cardinal_bases;
use crate::conductivity::Conductivity;
use crate::config::MpfaConfig;
use crate::geometry::{directional_conductivity, sub_face_normal_area};
use crate::region::{schur_reduce, InteractionRegion, RegionMatrices};
use crate::transmissibility::{ConnectionStencil, TransmissibilityTable};

use super::{
    boundary_vertex_contribution, sweep_vertices, TransmissibilityScheme, VertexContribution,
};

/// O 方法格式
#[derive(Debug, Clone)]
pub struct OMethodScheme {
    continuity: Scalar,
    parallel: bool,
    parallel_threshold: usize,
}

impl OMethodScheme {
    /// 以默认连续性参数 (1.0) 创建
    pub fn new() -> Self {
        Self::from_config(&MpfaConfig::default())
    }

    /// 从配置创建
    pub fn from_config(config: &MpfaConfig) -> Self {
        Self {
            continuity: config.continuity,
            parallel: config.parallel,
            parallel_threshold: config.parallel_threshold,
        }
    }
}

impl Default for OMethodScheme {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmissibilityScheme for OMethodScheme {
    fn name(&self) -> &'static str {
        "O_MPFA"
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
                interior_vertex_contribution(mesh, conductivity, point, self.continuity)
            }
        })
    }
}

/// 构建覆盖顶点全部相邻单元/界面的 O 区域
fn build_o_region(mesh: &Mesh, point: usize) -> PfResult<InteractionRegion> {
    let mut region = InteractionRegion::new(point);

    for &element in mesh.point_elements(point) {
        region.add_element(element);
    }
    for &connection in &mesh.connections_at_point(point) {
        region.add_connection(connection);
    }
    for &iface in mesh.point_interfaces(point) {
        let owner = mesh.interface(iface).element;
        let local = region.element_index(owner).ok_or_else(|| {
            PfError::internal(format!("界面 {iface} 的归属单元不在顶点 {point} 的单元表中"))
        })?;
        region.push_interface(local, iface);
    }
    Ok(region)
}

/// 内部顶点的 O 区域贡献
fn interior_vertex_contribution(
    mesh: &Mesh,
    conductivity: &dyn Conductivity,
    point: usize,
    continuity: Scalar,
) -> PfResult<VertexContribution> {
    let region = build_o_region(mesh, point)?;
    let n_conns = region.num_connections();
    let n_elems = region.num_elements();
    if n_conns == 0 {
        return Ok(Vec::new());
    }

    let vertex = mesh.point_coord(point);
    let mut matrices = RegionMatrices::zeros(n_conns, n_elems);

    for (local_el, &element) in region.elements().iter().enumerate() {
        let ifaces = region.interfaces(local_el);
        if ifaces.len() < 2 || ifaces.len() > 3 {
            return Err(PfError::unsupported_topology(
                point,
                format!(
                    "单元 {element} 在顶点处有 {} 个界面（支持 2 或 3 个）",
                    ifaces.len()
                ),
            ));
        }

        // 单元中心 + 各界面连续性点
        let mut points = Vec::with_capacity(ifaces.len() + 1);
        points.push(mesh.element(element).center);
        let mut columns = Vec::with_capacity(ifaces.len());
        for &iface in ifaces {
            let connection = mesh.interface(iface).connection.ok_or_else(|| {
                PfError::internal(format!("内部顶点 {point} 的界面 {iface} 无连接"))
            })?;
            let column = region.connection_index(connection).ok_or_else(|| {
                PfError::internal(format!("连接 {connection} 不在顶点 {point} 的区域中"))
            })?;
            columns.push(column);
            points.push(vertex + continuity * (mesh.interface(iface).center - vertex));
        }

        let bases = cardinal_bases(element, &points)?;
        let tensor = conductivity.tensor(element);

        for (face_slot, &iface) in ifaces.iter().enumerate() {
            let row = columns[face_slot];
            let connection = region.connections()[row];
            let is_here_side = mesh.connection(connection).here == iface;

            let normal_area = sub_face_normal_area(mesh, iface, point)?;
            let omega = directional_conductivity(&tensor, normal_area);

            // 基 0: 单元中心势
            let f0 = omega.dot(bases[0].gradient());
            matrices.b[(row, local_el)] -= f0;
            if is_here_side {
                matrices.d[(row, local_el)] -= f0;
            }
            // 基 1..: 连续性点势
            for (slot, &column) in columns.iter().enumerate() {
                let fj = omega.dot(bases[slot + 1].gradient());
                matrices.a[(row, column)] += fj;
                if is_here_side {
                    matrices.c[(row, column)] += fj;
                }
            }
        }
    }

    let t = schur_reduce(point, &matrices)?;

    let mut out = Vec::with_capacity(n_conns);
    for (local_conn, &connection) in region.connections().iter().enumerate() {
        let mut stencil = ConnectionStencil::new();
        for (local_el, &element) in region.elements().iter().enumerate() {
            let value = t[(local_conn, local_el)];
            if value != 0.0 {
                stencil.add(element, value);
            }
        }
        out.push((connection, stencil));
    }
    Ok(out)
}
