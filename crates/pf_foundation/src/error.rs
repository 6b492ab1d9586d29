// crates/pf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `PfError` 枚举和 `PfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **可定位**: 几何/拓扑错误携带出错的单元或顶点索引
//! 2. **可恢复**: 退化局部系统作为错误向上传播，调用方可降级格式重算
//! 3. **诊断分离**: 自检偏差通过 tracing 上报，不进入错误通道
//!
//! # 示例
//!
//! ```
//! use pf_foundation::error::{PfError, PfResult};
//!
//! fn check_continuity(eta: f64) -> PfResult<()> {
//!     if eta <= 0.0 || eta > 1.0 {
//!         return Err(PfError::config("连续性参数必须位于 (0,1] 区间"));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// 统一结果类型
pub type PfResult<T> = Result<T, PfError>;

/// PoroFlow 错误类型
///
/// 传导率计算的错误传播策略：几何/拓扑错误中止整次计算
/// （不完整的模板集交给压力求解器是不安全的）。
#[derive(Error, Debug)]
pub enum PfError {
    /// 退化局部系统
    ///
    /// 基函数插值矩阵或 Schur 消元矩阵奇异，通常由共线/共面的
    /// 连续性点或非对称正定的传导率张量引起。
    #[error("退化局部系统: {entity} {index}: {message}")]
    DegenerateSystem {
        /// 出错实体类别（"element" / "vertex" / "connection"）
        entity: &'static str,
        /// 实体索引
        index: usize,
        /// 具体原因
        message: String,
    },

    /// 不支持的局部拓扑
    ///
    /// L 族格式要求的主单元（顶点处恰有 3 个界面）不存在，
    /// 或斜区域的对位单元不唯一。
    #[error("不支持的局部拓扑: 顶点 {point}: {message}")]
    UnsupportedTopology {
        /// 顶点索引
        point: usize,
        /// 具体原因
        message: String,
    },

    /// 无效网格拓扑
    #[error("无效的网格拓扑: {message}")]
    InvalidMesh {
        /// 具体错误信息
        message: String,
    },

    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl PfError {
    /// 退化局部系统
    pub fn degenerate_system(
        entity: &'static str,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::DegenerateSystem {
            entity,
            index,
            message: message.into(),
        }
    }

    /// 单元处的退化基函数系统
    pub fn degenerate_element(index: usize, message: impl Into<String>) -> Self {
        Self::degenerate_system("element", index, message)
    }

    /// 顶点处的退化 Schur 系统
    pub fn degenerate_vertex(index: usize, message: impl Into<String>) -> Self {
        Self::degenerate_system("vertex", index, message)
    }

    /// 不支持的局部拓扑
    pub fn unsupported_topology(point: usize, message: impl Into<String>) -> Self {
        Self::UnsupportedTopology {
            point,
            message: message.into(),
        }
    }

    /// 无效网格
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl PfError {
    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> PfResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}
