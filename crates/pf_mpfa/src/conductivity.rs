// crates/pf_mpfa/src/conductivity.rs

//! 传导率查询能力
//!
//! 单元 → 对称正定 3×3 张量的纯映射，由外部供给（绝对渗透率、
//! 岩石热导率等）。零张量是合法取值（非活动单元）。
//!
//! 对称正定性不做急切校验：违反时在基函数或 T 矩阵求解阶段
//! 以奇异矩阵错误暴露。

use glam::{DMat3, DVec3};
use pf_foundation::prelude::*;
use pf_mesh::Mesh;

/// 传导率查询能力
pub trait Conductivity: Sync {
    /// 给定单元的传导率张量
    fn tensor(&self, element: usize) -> DMat3;
}

/// 各向同性张量 k·I
pub fn isotropic_tensor(k: Scalar) -> DMat3 {
    DMat3::from_diagonal(DVec3::splat(k))
}

/// 对角张量 diag(kx, ky, kz)
pub fn diagonal_tensor(kx: Scalar, ky: Scalar, kz: Scalar) -> DMat3 {
    DMat3::from_diagonal(DVec3::new(kx, ky, kz))
}

// ============================================================
// 实现
// ============================================================

/// 全域均匀传导率
#[derive(Debug, Clone, Copy)]
pub struct UniformConductivity {
    tensor: DMat3,
}

impl UniformConductivity {
    /// 从张量创建
    pub fn new(tensor: DMat3) -> Self {
        Self { tensor }
    }

    /// 各向同性均匀场
    pub fn isotropic(k: Scalar) -> Self {
        Self::new(isotropic_tensor(k))
    }
}

impl Conductivity for UniformConductivity {
    #[inline]
    fn tensor(&self, _element: usize) -> DMat3 {
        self.tensor
    }
}

/// 逐单元传导率
#[derive(Debug, Clone)]
pub struct ElementConductivity {
    tensors: Vec<DMat3>,
}

impl ElementConductivity {
    /// 从逐单元张量数组创建
    pub fn new(tensors: Vec<DMat3>) -> Self {
        Self { tensors }
    }
}

impl Conductivity for ElementConductivity {
    #[inline]
    fn tensor(&self, element: usize) -> DMat3 {
        self.tensors[element]
    }
}

/// 按岩性表的传导率
///
/// 经由单元的岩性引用查岩石属性表。
#[derive(Debug, Clone)]
pub struct RockConductivity {
    element_rock: Vec<usize>,
    rocks: Vec<DMat3>,
}

impl RockConductivity {
    /// 从网格岩性引用与岩石张量表创建
    pub fn from_mesh(mesh: &Mesh, rocks: Vec<DMat3>) -> PfResult<Self> {
        let element_rock: Vec<usize> = mesh.elements().iter().map(|e| e.rock).collect();
        for (el, &rock) in element_rock.iter().enumerate() {
            if rock >= rocks.len() {
                return Err(PfError::invalid_mesh(format!(
                    "单元 {el} 的岩性引用 {rock} 超出岩石表 0..{}",
                    rocks.len()
                )));
            }
        }
        Ok(Self {
            element_rock,
            rocks,
        })
    }
}

impl Conductivity for RockConductivity {
    #[inline]
    fn tensor(&self, element: usize) -> DMat3 {
        self.rocks[self.element_rock[element]]
    }
}
