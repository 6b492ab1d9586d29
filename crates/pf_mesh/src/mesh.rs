// crates/pf_mesh/src/mesh.rs

//! 只读多面体网格模型
//!
//! 离散化核心消费的网格查询接口。网格由外部协作方装配后冻结，
//! 传导率计算期间只读。
//!
//! # 协作方保证的不变量
//!
//! 1. 相邻连接的两个界面面积相等、法向相反
//! 2. 每个内部角点至少关联 3 个单元
//! 3. 边界角点至少关联 1 个边界界面
//! 4. 界面角点按循环序排列（半边中点计算依赖该序）
//!
//! 以上不变量可通过 [`Mesh::validate`] 显式校验；核心不隐式调用。

use glam::DVec3;
use pf_foundation::prelude::*;
use serde::{Deserialize, Serialize};

use crate::topology::CsrConnectivity;

// ============================================================
// 网格实体
// ============================================================

/// 网格单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// 单元中心 [m]
    pub center: DVec3,
    /// 单元体积 [m³]
    pub volume: Scalar,
    /// 岩性引用（传导率查询可据此映射到岩石属性表）
    pub rock: usize,
}

impl Element {
    /// 创建单元
    pub fn new(center: DVec3, volume: Scalar, rock: usize) -> Self {
        Self {
            center,
            volume,
            rock,
        }
    }
}

/// 网格界面
///
/// 每个界面归属唯一单元，法向指向单元外侧。内部面由一对界面表示，
/// 二者通过同一条相邻连接互相引用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    /// 界面面积 [m²]
    pub area: Scalar,
    /// 单位外法向
    pub normal: DVec3,
    /// 界面中心 [m]
    pub center: DVec3,
    /// 是否为域边界界面（由 [`Mesh::new`] 派生）
    pub boundary: bool,
    /// 归属单元索引
    pub element: usize,
    /// 相邻连接索引（边界界面为 None，由 [`Mesh::new`] 派生）
    pub connection: Option<usize>,
    /// 角点索引，循环有序
    pub corners: Vec<usize>,
}

impl Interface {
    /// 创建界面；`boundary` 与 `connection` 由 [`Mesh::new`] 派生
    pub fn new(
        area: Scalar,
        normal: DVec3,
        center: DVec3,
        element: usize,
        corners: Vec<usize>,
    ) -> Self {
        Self {
            area,
            normal,
            center,
            boundary: true,
            element,
            connection: None,
            corners,
        }
    }
}

/// 角点视图
///
/// 坐标加上与该点关联的界面/单元有序列表。关联性以 CSR 存储在
/// [`Mesh`] 内部，此结构仅作查询返回值。
#[derive(Debug, Clone, Copy)]
pub struct CornerPoint<'a> {
    /// 角点索引
    pub index: usize,
    /// 坐标 [m]
    pub coord: DVec3,
    /// 关联界面（升序）
    pub interfaces: &'a [usize],
    /// 关联单元（升序；长度即顶点度数）
    pub elements: &'a [usize],
}

/// 相邻连接
///
/// 一对互为镜像的界面与其两侧单元。非相邻连接（断层 NNC）由
/// 协作方以同样的结构注册。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighbourConnection {
    /// here 侧界面索引
    pub here: usize,
    /// there 侧界面索引
    pub there: usize,
    /// here 侧单元索引
    pub element_here: usize,
    /// there 侧单元索引
    pub element_there: usize,
    /// 传导率倍率（裂缝等效应，默认 1.0）
    pub multiplier: Scalar,
}

impl NeighbourConnection {
    /// 创建倍率为 1 的连接
    pub fn new(here: usize, there: usize, element_here: usize, element_there: usize) -> Self {
        Self {
            here,
            there,
            element_here,
            element_there,
            multiplier: 1.0,
        }
    }

    /// 给定一侧单元，返回另一侧单元
    #[inline]
    pub fn other_element(&self, element: usize) -> usize {
        if element == self.element_here {
            self.element_there
        } else {
            self.element_here
        }
    }

    /// 连接是否关联给定单元
    #[inline]
    pub fn touches_element(&self, element: usize) -> bool {
        self.element_here == element || self.element_there == element
    }
}

// ============================================================
// 网格
// ============================================================

/// 只读多面体网格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    elements: Vec<Element>,
    interfaces: Vec<Interface>,
    point_coords: Vec<DVec3>,
    connections: Vec<NeighbourConnection>,
    /// 角点→界面关联
    point_interfaces: CsrConnectivity,
    /// 角点→单元关联
    point_elements: CsrConnectivity,
    /// 角点是否触及边界界面
    point_boundary: Vec<bool>,
}

impl Mesh {
    /// 装配网格
    ///
    /// 从连接列表派生每个界面的 `connection` 引用与 `boundary` 标志，
    /// 并构建角点关联性（升序、去重）。
    pub fn new(
        elements: Vec<Element>,
        mut interfaces: Vec<Interface>,
        point_coords: Vec<DVec3>,
        connections: Vec<NeighbourConnection>,
    ) -> PfResult<Self> {
        for (ci, conn) in connections.iter().enumerate() {
            for iface in [conn.here, conn.there] {
                PfError::check_index("interface", iface, interfaces.len())?;
                interfaces[iface].connection = Some(ci);
                interfaces[iface].boundary = false;
            }
            PfError::check_index("element", conn.element_here, elements.len())?;
            PfError::check_index("element", conn.element_there, elements.len())?;
        }

        let n_points = point_coords.len();
        let mut iface_builder = CsrConnectivity::with_rows(n_points);
        let mut element_builder = CsrConnectivity::with_rows(n_points);
        let mut point_boundary = vec![false; n_points];

        for (fi, iface) in interfaces.iter().enumerate() {
            PfError::check_index("element", iface.element, elements.len())?;
            for &p in &iface.corners {
                PfError::check_index("point", p, n_points)?;
                iface_builder.push(p, fi);
                element_builder.push(p, iface.element);
                if iface.boundary {
                    point_boundary[p] = true;
                }
            }
        }

        Ok(Self {
            elements,
            interfaces,
            point_coords,
            connections,
            point_interfaces: iface_builder.build_sorted(),
            point_elements: element_builder.build_sorted(),
            point_boundary,
        })
    }

    // ========================================================
    // 基本统计
    // ========================================================

    /// 单元数量
    #[inline]
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// 界面数量
    #[inline]
    pub fn n_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    /// 角点数量
    #[inline]
    pub fn n_points(&self) -> usize {
        self.point_coords.len()
    }

    /// 连接数量
    #[inline]
    pub fn n_connections(&self) -> usize {
        self.connections.len()
    }

    // ========================================================
    // 实体访问
    // ========================================================

    /// 获取单元
    #[inline]
    pub fn element(&self, index: usize) -> &Element {
        &self.elements[index]
    }

    /// 所有单元
    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// 获取界面
    #[inline]
    pub fn interface(&self, index: usize) -> &Interface {
        &self.interfaces[index]
    }

    /// 所有界面
    #[inline]
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// 获取连接
    #[inline]
    pub fn connection(&self, index: usize) -> &NeighbourConnection {
        &self.connections[index]
    }

    /// 所有连接
    #[inline]
    pub fn connections(&self) -> &[NeighbourConnection] {
        &self.connections
    }

    /// 角点坐标
    #[inline]
    pub fn point_coord(&self, point: usize) -> DVec3 {
        self.point_coords[point]
    }

    /// 角点视图
    pub fn point(&self, point: usize) -> CornerPoint<'_> {
        CornerPoint {
            index: point,
            coord: self.point_coords[point],
            interfaces: self.point_interfaces.row(point),
            elements: self.point_elements.row(point),
        }
    }

    // ========================================================
    // 邻接查询
    // ========================================================

    /// 角点关联的界面（升序）
    #[inline]
    pub fn point_interfaces(&self, point: usize) -> &[usize] {
        self.point_interfaces.row(point)
    }

    /// 角点关联的单元（升序）
    #[inline]
    pub fn point_elements(&self, point: usize) -> &[usize] {
        self.point_elements.row(point)
    }

    /// 顶点度数：共享该角点的不同单元数
    #[inline]
    pub fn vertex_degree(&self, point: usize) -> usize {
        self.point_elements.row_len(point)
    }

    /// 角点是否触及边界界面
    #[inline]
    pub fn point_is_boundary(&self, point: usize) -> bool {
        self.point_boundary[point]
    }

    /// 触及角点的连接（升序去重）
    pub fn connections_at_point(&self, point: usize) -> Vec<usize> {
        let mut result: Vec<usize> = self
            .point_interfaces
            .row(point)
            .iter()
            .filter_map(|&f| self.interfaces[f].connection)
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// 界面的镜像界面（同一连接的另一侧）
    pub fn neighbour_interface(&self, iface: usize) -> Option<usize> {
        let conn = &self.connections[self.interfaces[iface].connection?];
        Some(if conn.here == iface {
            conn.there
        } else {
            conn.here
        })
    }

    /// 单元在给定角点处归属的界面（升序）
    pub fn element_interfaces_at_point(&self, element: usize, point: usize) -> Vec<usize> {
        self.point_interfaces
            .row(point)
            .iter()
            .copied()
            .filter(|&f| self.interfaces[f].element == element)
            .collect()
    }

    /// 角点处连接两个给定单元的连接索引
    pub fn connection_between_at_point(&self, point: usize, a: usize, b: usize) -> Option<usize> {
        self.connections_at_point(point).into_iter().find(|&c| {
            let conn = &self.connections[c];
            conn.touches_element(a) && conn.touches_element(b) && a != b
        })
    }

    /// 连接是否邻接边界：任一侧界面的任一角点触及边界
    pub fn connection_is_boundary_adjacent(&self, connection: usize) -> bool {
        let conn = &self.connections[connection];
        [conn.here, conn.there].iter().any(|&f| {
            self.interfaces[f]
                .corners
                .iter()
                .any(|&p| self.point_boundary[p])
        })
    }

    /// 设置连接倍率（裂缝等效应；装配期由协作方调用）
    pub fn set_connection_multiplier(&mut self, connection: usize, multiplier: Scalar) {
        self.connections[connection].multiplier = multiplier;
    }

    // ========================================================
    // 校验
    // ========================================================

    /// 校验协作方承诺的网格不变量
    pub fn validate(&self) -> PfResult<()> {
        for (ci, conn) in self.connections.iter().enumerate() {
            let here = &self.interfaces[conn.here];
            let there = &self.interfaces[conn.there];
            if (here.area - there.area).abs() > AREA_EPSILON.max(1e-9 * here.area) {
                return Err(PfError::invalid_mesh(format!(
                    "连接 {ci} 两侧界面面积不等: {} vs {}",
                    here.area, there.area
                )));
            }
            if (here.normal + there.normal).length() > 1e-9 {
                return Err(PfError::invalid_mesh(format!(
                    "连接 {ci} 两侧法向不相反: {:?} vs {:?}",
                    here.normal, there.normal
                )));
            }
            if here.element != conn.element_here || there.element != conn.element_there {
                return Err(PfError::invalid_mesh(format!(
                    "连接 {ci} 的界面归属单元与连接单元不一致"
                )));
            }
        }

        for p in 0..self.n_points() {
            if !self.point_boundary[p] && self.vertex_degree(p) < 3 {
                return Err(PfError::invalid_mesh(format!(
                    "内部角点 {p} 仅关联 {} 个单元（至少 3 个）",
                    self.vertex_degree(p)
                )));
            }
            if self.point_boundary[p]
                && !self
                    .point_interfaces
                    .row(p)
                    .iter()
                    .any(|&f| self.interfaces[f].boundary)
            {
                return Err(PfError::invalid_mesh(format!(
                    "边界角点 {p} 无关联的边界界面"
                )));
            }
        }

        for (fi, iface) in self.interfaces.iter().enumerate() {
            if iface.corners.len() < 2 {
                return Err(PfError::invalid_mesh(format!(
                    "界面 {fi} 角点数不足: {}",
                    iface.corners.len()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 两个单位立方单元，共享 x=1 平面的内部面
    fn two_cell_mesh() -> Mesh {
        crate::generation::CartesianMeshBuilder::new(2, 1, 1)
            .build()
            .expect("生成 2x1x1 网格")
    }

    #[test]
    fn test_two_cell_counts() {
        let mesh = two_cell_mesh();
        assert_eq!(mesh.n_elements(), 2);
        assert_eq!(mesh.n_connections(), 1);
        // 每单元 6 个界面
        assert_eq!(mesh.n_interfaces(), 12);
        assert_eq!(mesh.n_points(), 12);
    }

    #[test]
    fn test_connection_pairing() {
        let mesh = two_cell_mesh();
        let conn = mesh.connection(0);
        let here = mesh.interface(conn.here);
        let there = mesh.interface(conn.there);

        assert!(!here.boundary);
        assert!(!there.boundary);
        assert_eq!(here.connection, Some(0));
        assert_eq!(mesh.neighbour_interface(conn.here), Some(conn.there));
        assert!((here.normal + there.normal).length() < 1e-14);
        assert!((here.area - there.area).abs() < 1e-14);
    }

    #[test]
    fn test_point_incidence() {
        let mesh = two_cell_mesh();
        // 共享面上的角点关联两个单元
        let conn = mesh.connection(0);
        for &p in &mesh.interface(conn.here).corners {
            assert_eq!(mesh.vertex_degree(p), 2);
            assert!(mesh.point_is_boundary(p));
            assert_eq!(mesh.connections_at_point(p), vec![0]);

            let view = mesh.point(p);
            assert_eq!(view.index, p);
            assert_eq!(view.elements, &[0, 1]);
            assert!(view.interfaces.contains(&conn.here));
            assert!(view.interfaces.contains(&conn.there));
        }
    }

    #[test]
    fn test_validate_passes() {
        let mesh = two_cell_mesh();
        mesh.validate().expect("合法网格应通过校验");
    }

    #[test]
    fn test_other_element() {
        let mesh = two_cell_mesh();
        let conn = mesh.connection(0);
        assert_eq!(conn.other_element(conn.element_here), conn.element_there);
        assert_eq!(conn.other_element(conn.element_there), conn.element_here);
    }
}
