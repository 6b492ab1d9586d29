// crates/pf_mesh/src/lib.rs

//! PoroFlow 网格层
//!
//! 提供离散化核心消费的只读多面体网格模型：
//! - 单元（中心、体积、岩性引用）
//! - 界面（面积、外法向、中心、角点循环序）
//! - 角点（坐标、关联界面/单元的有序列表）
//! - 相邻连接（here/there 界面对与单元对、传导率倍率）
//!
//! # 模块概览
//!
//! - [`topology`]: CSR 格式的关联性存储
//! - [`mesh`]: 网格数据模型与邻接查询
//! - [`generation`]: 笛卡尔盒网格生成器（测试与示例用）
//!
//! # 设计原则
//!
//! 网格由外部协作方（网格构建器）装配；本层只保证查询接口与
//! 不变量校验，不包含网格生成算法（笛卡尔生成器除外）。

#![warn(clippy::all)]

pub mod generation;
pub mod mesh;
pub mod topology;

pub use generation::CartesianMeshBuilder;
pub use mesh::{CornerPoint, Element, Interface, Mesh, NeighbourConnection};
pub use topology::CsrConnectivity;
