// crates/pf_mpfa/src/region.rs

//! 交互区域与 Schur 消元
//!
//! 交互区域是围绕一个网格顶点（O 方法）或顶点加指定单元组
//! （L 族）构建的局部编号上下文：区域单元集的稠密 0 基索引、
//! 区域连接（连续性自由度）的局部索引、以及每个单元在区域内的
//! 有序界面子表。
//!
//! 区域对每次顶点/连接求值现建现弃。相对局部线性求解，重建
//! 开销可忽略，不保留任何跨调用状态。

use nalgebra::DMatrix;
use pf_foundation::prelude::*;
use std::collections::HashMap;

/// 交互区域
///
/// O / L / L4 共用的局部编号结构；格式各自的矩阵装配逻辑以
/// 自由函数操作该结构。
#[derive(Debug, Clone)]
pub struct InteractionRegion {
    vertex: usize,
    elements: Vec<usize>,
    element_index: HashMap<usize, usize>,
    connections: Vec<usize>,
    connection_index: HashMap<usize, usize>,
    element_interfaces: Vec<Vec<usize>>,
}

impl InteractionRegion {
    /// 创建锚定在给定顶点的空区域
    pub fn new(vertex: usize) -> Self {
        Self {
            vertex,
            elements: Vec::new(),
            element_index: HashMap::new(),
            connections: Vec::new(),
            connection_index: HashMap::new(),
            element_interfaces: Vec::new(),
        }
    }

    /// 锚定顶点
    #[inline]
    pub fn vertex(&self) -> usize {
        self.vertex
    }

    /// 登记单元，返回局部索引（重复登记返回已有索引）
    pub fn add_element(&mut self, element: usize) -> usize {
        if let Some(&local) = self.element_index.get(&element) {
            return local;
        }
        let local = self.elements.len();
        self.elements.push(element);
        self.element_index.insert(element, local);
        self.element_interfaces.push(Vec::new());
        local
    }

    /// 登记连接（连续性自由度），返回局部索引
    pub fn add_connection(&mut self, connection: usize) -> usize {
        if let Some(&local) = self.connection_index.get(&connection) {
            return local;
        }
        let local = self.connections.len();
        self.connections.push(connection);
        self.connection_index.insert(connection, local);
        local
    }

    /// 向局部单元追加区域界面
    pub fn push_interface(&mut self, local_element: usize, iface: usize) {
        self.element_interfaces[local_element].push(iface);
    }

    /// 区域单元（全局索引，按局部序）
    #[inline]
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    /// 区域连接（全局索引，按局部序）
    #[inline]
    pub fn connections(&self) -> &[usize] {
        &self.connections
    }

    /// 局部单元的区域界面子表
    #[inline]
    pub fn interfaces(&self, local_element: usize) -> &[usize] {
        &self.element_interfaces[local_element]
    }

    /// 全局单元 → 局部索引
    #[inline]
    pub fn element_index(&self, element: usize) -> Option<usize> {
        self.element_index.get(&element).copied()
    }

    /// 全局连接 → 局部索引
    #[inline]
    pub fn connection_index(&self, connection: usize) -> Option<usize> {
        self.connection_index.get(&connection).copied()
    }

    /// 区域单元数
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// 区域连续性自由度数
    #[inline]
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }
}

// ============================================================
// 区域矩阵与 Schur 消元
// ============================================================

/// 区域局部矩阵组
///
/// - `a`: 连续性 × 连续性
/// - `b`: 连续性 × 单元
/// - `c`: 通量 × 连续性
/// - `d`: 通量 × 单元
#[derive(Debug, Clone)]
pub struct RegionMatrices {
    /// 连续性方程的连续性势系数
    pub a: DMatrix<Scalar>,
    /// 连续性方程的单元势系数
    pub b: DMatrix<Scalar>,
    /// 通量表达式的连续性势系数
    pub c: DMatrix<Scalar>,
    /// 通量表达式的单元势系数
    pub d: DMatrix<Scalar>,
}

impl RegionMatrices {
    /// 创建全零矩阵组（通量行数 = 连续性自由度数）
    pub fn zeros(n_connections: usize, n_elements: usize) -> Self {
        Self {
            a: DMatrix::zeros(n_connections, n_connections),
            b: DMatrix::zeros(n_connections, n_elements),
            c: DMatrix::zeros(n_connections, n_connections),
            d: DMatrix::zeros(n_connections, n_elements),
        }
    }
}

/// Schur 消元：T = C·A⁻¹·B − D
///
/// 消去中间连续性未知量，把通量表达为单元势的线性组合。
/// A 奇异说明传导率非对称正定或几何退化，以可恢复错误上报。
pub fn schur_reduce(vertex: usize, m: &RegionMatrices) -> PfResult<DMatrix<Scalar>> {
    let lu = m.a.clone().lu();
    let ainv_b = lu.solve(&m.b).ok_or_else(|| {
        PfError::degenerate_vertex(vertex, "Schur 消元矩阵奇异（非对称正定或退化的传导率）")
    })?;
    Ok(&m.c * ainv_b - &m.d)
}
