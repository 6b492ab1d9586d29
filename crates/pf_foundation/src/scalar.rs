// crates/pf_foundation/src/scalar.rs

//! 标量别名与数值容差
//!
//! 整个项目统一使用双精度标量。容差常量集中在此定义，
//! 避免各模块散落魔法数字。

/// 统一标量类型
pub type Scalar = f64;

/// 几何距离判零阈值 [m]
///
/// 小于该值的点间距视为重合（退化几何）。
pub const DISTANCE_EPSILON: Scalar = 1e-12;

/// 面积判零阈值 [m²]
pub const AREA_EPSILON: Scalar = 1e-14;

/// 传导率模判零阈值
///
/// TPFA 中任一侧 ‖K·n‖ 低于该值时，连接系数取零。
pub const CONDUCTIVITY_EPSILON: Scalar = 1e-14;

/// 均匀流自检的相对误差容差
pub const UNIFORM_FLOW_TOLERANCE: Scalar = 1e-6;

/// 模板行和（局部守恒）自检容差
pub const ROW_SUM_TOLERANCE: Scalar = 1e-8;
