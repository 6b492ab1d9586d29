// crates/pf_foundation/src/lib.rs

//! PoroFlow Foundation Layer
//!
//! 基础层，提供整个项目的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`scalar`]: 标量别名与数值容差常量
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 thiserror
//! 2. **层次化**: 网格与离散化相关的逻辑在上层 crate 中实现
//! 3. **可追溯**: 错误携带出错的单元/顶点索引，便于定位退化网格

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod scalar;

pub use error::{PfError, PfResult};
pub use scalar::Scalar;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{PfError, PfResult};
    pub use crate::scalar::{
        Scalar, AREA_EPSILON, DISTANCE_EPSILON, ROW_SUM_TOLERANCE, UNIFORM_FLOW_TOLERANCE,
    };
}
