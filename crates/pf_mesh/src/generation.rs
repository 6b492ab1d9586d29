// crates/pf_mesh/src/generation.rs

//! 笛卡尔盒网格生成器
//!
//! 生成轴对齐的结构化六面体网格，装配为非结构化网格模型：
//! 内部面由一对互为镜像的界面与一条相邻连接表示，界面角点
//! 按循环序排列（从外法向一侧看逆时针）。
//!
//! 服务于测试与示例；工程网格由外部协作方装配。
//!
//! # 示例
//!
//! ```
//! use pf_mesh::CartesianMeshBuilder;
//!
//! let mesh = CartesianMeshBuilder::new(2, 2, 2)
//!     .with_spacing(10.0, 10.0, 2.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(mesh.n_elements(), 8);
//! assert_eq!(mesh.n_connections(), 12);
//! ```

use glam::DVec3;
use pf_foundation::prelude::*;

use crate::mesh::{Element, Interface, Mesh, NeighbourConnection};

/// 单元 6 个方向：+x, -x, +y, -y, +z, -z
const DIRECTIONS: [(i64, i64, i64); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// 各方向界面的角点偏移（单元局部节点坐标，循环序）
///
/// 顺序保证 (c1-c0)×(c3-c0) 指向外法向。
const CORNER_OFFSETS: [[(usize, usize, usize); 4]; 6] = [
    // +x
    [(1, 0, 0), (1, 1, 0), (1, 1, 1), (1, 0, 1)],
    // -x
    [(0, 0, 0), (0, 0, 1), (0, 1, 1), (0, 1, 0)],
    // +y
    [(0, 1, 0), (0, 1, 1), (1, 1, 1), (1, 1, 0)],
    // -y
    [(0, 0, 0), (1, 0, 0), (1, 0, 1), (0, 0, 1)],
    // +z
    [(0, 0, 1), (1, 0, 1), (1, 1, 1), (0, 1, 1)],
    // -z
    [(0, 0, 0), (0, 1, 0), (1, 1, 0), (1, 0, 0)],
];

/// 相反方向索引
const OPPOSITE: [usize; 6] = [1, 0, 3, 2, 5, 4];

/// 笛卡尔盒网格构建器
#[derive(Debug, Clone)]
pub struct CartesianMeshBuilder {
    nx: usize,
    ny: usize,
    nz: usize,
    dx: Scalar,
    dy: Scalar,
    dz: Scalar,
    origin: DVec3,
}

impl CartesianMeshBuilder {
    /// 创建 nx × ny × nz 单元、单位间距的构建器
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            dx: 1.0,
            dy: 1.0,
            dz: 1.0,
            origin: DVec3::ZERO,
        }
    }

    /// 设置网格间距
    pub fn with_spacing(mut self, dx: Scalar, dy: Scalar, dz: Scalar) -> Self {
        self.dx = dx;
        self.dy = dy;
        self.dz = dz;
        self
    }

    /// 设置原点
    pub fn with_origin(mut self, origin: DVec3) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    fn cell_id(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.nx * (j + self.ny * k)
    }

    #[inline]
    fn node_id(&self, i: usize, j: usize, k: usize) -> usize {
        i + (self.nx + 1) * (j + (self.ny + 1) * k)
    }

    #[inline]
    fn node_coord(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.origin + DVec3::new(i as f64 * self.dx, j as f64 * self.dy, k as f64 * self.dz)
    }

    fn face_area(&self, dir: usize) -> Scalar {
        match dir / 2 {
            0 => self.dy * self.dz,
            1 => self.dx * self.dz,
            _ => self.dx * self.dy,
        }
    }

    /// 生成网格
    pub fn build(&self) -> PfResult<Mesh> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(PfError::config("网格各方向单元数必须为正"));
        }
        if self.dx <= 0.0 || self.dy <= 0.0 || self.dz <= 0.0 {
            return Err(PfError::config("网格间距必须为正"));
        }

        let (nx, ny, nz) = (self.nx, self.ny, self.nz);
        let n_cells = nx * ny * nz;
        let half = DVec3::new(self.dx, self.dy, self.dz) * 0.5;
        let volume = self.dx * self.dy * self.dz;

        let mut point_coords = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    // node_id 按 i 最快变化排布，与此循环序一致
                    point_coords.push(self.node_coord(i, j, k));
                }
            }
        }

        let mut elements = Vec::with_capacity(n_cells);
        let mut interfaces = Vec::with_capacity(n_cells * 6);
        // face_of[cell][dir] -> 界面索引
        let mut face_of = vec![[usize::MAX; 6]; n_cells];

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let cell = self.cell_id(i, j, k);
                    let center = self.node_coord(i, j, k) + half;
                    elements.push(Element::new(center, volume, 0));

                    for (dir, &(sx, sy, sz)) in DIRECTIONS.iter().enumerate() {
                        let normal = DVec3::new(sx as f64, sy as f64, sz as f64);
                        let face_center = center
                            + DVec3::new(
                                sx as f64 * half.x,
                                sy as f64 * half.y,
                                sz as f64 * half.z,
                            );
                        let corners = CORNER_OFFSETS[dir]
                            .iter()
                            .map(|&(oi, oj, ok)| self.node_id(i + oi, j + oj, k + ok))
                            .collect();
                        face_of[cell][dir] = interfaces.len();
                        interfaces.push(Interface::new(
                            self.face_area(dir),
                            normal,
                            face_center,
                            cell,
                            corners,
                        ));
                    }
                }
            }
        }

        let mut connections = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let cell = self.cell_id(i, j, k);
                    for (dir, &(sx, sy, sz)) in DIRECTIONS.iter().enumerate() {
                        // 仅正方向创建连接，避免重复
                        if sx + sy + sz < 0 {
                            continue;
                        }
                        let (ni, nj, nk) = (
                            i as i64 + sx,
                            j as i64 + sy,
                            k as i64 + sz,
                        );
                        if ni >= nx as i64 || nj >= ny as i64 || nk >= nz as i64 {
                            continue;
                        }
                        let neighbour = self.cell_id(ni as usize, nj as usize, nk as usize);
                        connections.push(NeighbourConnection::new(
                            face_of[cell][dir],
                            face_of[neighbour][OPPOSITE[dir]],
                            cell,
                            neighbour,
                        ));
                    }
                }
            }
        }

        Mesh::new(elements, interfaces, point_coords, connections)
    }
}
