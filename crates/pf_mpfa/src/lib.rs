// crates/pf_mpfa/src/lib.rs

//! PoroFlow 多点通量逼近 (MPFA) 传导率引擎
//!
//! 为非结构化、可各向异性的三维多面体网格计算有限体积通量模板
//! （传导率）。对每条单元间连接，产出一组 (单元, 系数) 对，其对
//! 单元中心势的线性组合逼近法向通量，与全张量传导率一致。下游的
//! 压力/饱和度求解器将这些模板装配进全局离散化矩阵。
//!
//! # 模块概览
//!
//! - [`transmissibility`]: 可累积的模板系数与按连接的模板表
//! - [`conductivity`]: 单元→对称正定 3×3 张量的查询能力
//! - [`geometry`]: 半边中点、子面面积/法向面积、方向传导率
//! - [`basis`]: 仿射基函数与基数基构造
//! - [`region`]: 共享交互区域与 Schur 消元
//! - [`schemes`]: TPFA / O / L / L4 四种格式与工厂
//! - [`computer`]: 编排器与均匀流自检
//!
//! # 格式选择
//!
//! - **TPFA**: 两点基线；始终可用，亦是边界顶点的强制回退
//! - **O_MPFA**: 每个网格顶点一个覆盖全部相邻单元的交互区域（默认）
//! - **L_MPFA**: 每条连接 1~2 个锚定在单一主单元的候选区域
//! - **L4_MPFA**: L 族扩展，增补四单元"斜"区域与附加消元步
//!
//! # 示例
//!
//! ```
//! use pf_mesh::CartesianMeshBuilder;
//! use pf_mpfa::{MpfaConfig, SchemeKind, TransmissibilityComputer, UniformConductivity};
//!
//! let mesh = CartesianMeshBuilder::new(2, 1, 1).build().unwrap();
//! let k = UniformConductivity::isotropic(1.0);
//! let computer = TransmissibilityComputer::new(
//!     MpfaConfig::default().with_scheme(SchemeKind::Tpfa),
//! ).unwrap();
//!
//! let table = computer.calculate(&mesh, &k).unwrap();
//! assert_eq!(table.stencil(0).len(), 2);
//! ```

#![warn(clippy::all)]

pub mod basis;
pub mod computer;
pub mod conductivity;
pub mod config;
pub mod geometry;
pub mod region;
pub mod schemes;
pub mod transmissibility;

pub use computer::TransmissibilityComputer;
pub use conductivity::{
    Conductivity, ElementConductivity, RockConductivity, UniformConductivity,
};
pub use config::{MpfaConfig, SchemeKind};
pub use schemes::{create_scheme, TransmissibilityScheme};
pub use transmissibility::{ConnectionStencil, TableStats, Transmissibility, TransmissibilityTable};
