// crates/pf_mpfa/src/transmissibility.rs

//! 传导率模板
//!
//! 一条连接的通量模板是一组 (单元, 系数) 对：对单元中心势的线性
//! 组合逼近穿过该连接的法向通量。系数按单元合并累积：同一单元的
//! 第二次贡献与已有系数相加，不产生重复条目。
//!
//! # 物理不变量
//!
//! - 均匀传导率 + 仿射势场下，模板作用于单元中心势应复现解析通量
//! - 无外部边界影响时，模板系数之和（对常数势场的作用）接近零

use pf_foundation::prelude::*;
use serde::{Deserialize, Serialize};

/// 单条模板系数：(单元索引, 系数)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transmissibility {
    /// 单元索引
    pub element: usize,
    /// 模板系数
    pub value: Scalar,
}

impl Transmissibility {
    /// 创建系数
    pub fn new(element: usize, value: Scalar) -> Self {
        Self { element, value }
    }

    /// 累积增量
    #[inline]
    pub fn add(&mut self, delta: Scalar) {
        self.value += delta;
    }

    /// 重缩放（用于连接倍率）
    #[inline]
    pub fn scale(&mut self, multiplier: Scalar) {
        self.value *= multiplier;
    }
}

/// 一条连接的通量模板
///
/// 条目按单元索引合并：`add` 对已存在的单元累加系数。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStencil {
    entries: Vec<Transmissibility>,
}

impl ConnectionStencil {
    /// 创建空模板
    pub fn new() -> Self {
        Self::default()
    }

    /// 累积一个单元的系数贡献，同单元合并
    pub fn add(&mut self, element: usize, delta: Scalar) {
        if let Some(entry) = self.entries.iter_mut().find(|t| t.element == element) {
            entry.add(delta);
        } else {
            self.entries.push(Transmissibility::new(element, delta));
        }
    }

    /// 合并另一模板的全部条目
    pub fn merge(&mut self, other: &ConnectionStencil) {
        for t in &other.entries {
            self.add(t.element, t.value);
        }
    }

    /// 全体系数重缩放
    pub fn scale(&mut self, multiplier: Scalar) {
        for t in &mut self.entries {
            t.scale(multiplier);
        }
    }

    /// 条目切片
    #[inline]
    pub fn entries(&self) -> &[Transmissibility] {
        &self.entries
    }

    /// 指定单元的系数（缺省为零）
    pub fn coefficient(&self, element: usize) -> Scalar {
        self.entries
            .iter()
            .find(|t| t.element == element)
            .map_or(0.0, |t| t.value)
    }

    /// 系数之和（常数势场下的净通量）
    pub fn row_sum(&self) -> Scalar {
        self.entries.iter().map(|t| t.value).sum()
    }

    /// 模板作用于单元中心势场
    pub fn apply(&self, potentials: &[Scalar]) -> Scalar {
        self.entries
            .iter()
            .map(|t| t.value * potentials[t.element])
            .sum()
    }

    /// 条目数（模板宽度）
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 模板表统计摘要
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TableStats {
    /// 连接总数
    pub n_connections: usize,
    /// 系数条目总数
    pub n_entries: usize,
    /// 最大模板宽度
    pub max_width: usize,
    /// 行和绝对值最大值
    pub max_abs_row_sum: Scalar,
}

/// 按连接索引的模板表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissibilityTable {
    stencils: Vec<ConnectionStencil>,
}

impl TransmissibilityTable {
    /// 创建 n 条连接的空表
    pub fn new(n_connections: usize) -> Self {
        Self {
            stencils: vec![ConnectionStencil::new(); n_connections],
        }
    }

    /// 连接数
    #[inline]
    pub fn len(&self) -> usize {
        self.stencils.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stencils.is_empty()
    }

    /// 某条连接的模板
    #[inline]
    pub fn stencil(&self, connection: usize) -> &ConnectionStencil {
        &self.stencils[connection]
    }

    /// 某条连接的可变模板
    #[inline]
    pub fn stencil_mut(&mut self, connection: usize) -> &mut ConnectionStencil {
        &mut self.stencils[connection]
    }

    /// 全部模板
    #[inline]
    pub fn stencils(&self) -> &[ConnectionStencil] {
        &self.stencils
    }

    /// 统计摘要
    pub fn stats(&self) -> TableStats {
        let mut stats = TableStats {
            n_connections: self.stencils.len(),
            ..TableStats::default()
        };
        for st in &self.stencils {
            stats.n_entries += st.len();
            stats.max_width = stats.max_width.max(st.len());
            stats.max_abs_row_sum = stats.max_abs_row_sum.max(st.row_sum().abs());
        }
        stats
    }
}
