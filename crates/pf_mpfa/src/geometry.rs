// crates/pf_mpfa/src/geometry.rs

//! MPFA 几何工具
//!
//! 多点格式共享的几何原语：
//!
//! - **半边中点**: 界面上与给定角点相邻的两条边的中点，界定该
//!   角点的子面范围（依赖界面角点的循环序）
//! - **子面面积**: 四边形扇 {界面中心, 角点, 半边₁, 半边₂} 的
//!   面积，按两个叉积三角形面积求和
//! - **子面法向面积**: 在子面上直接积分近似外法向；按界面角点数
//!   (2 / 3 / 4 / 一般多边形) 采用不同公式，4 点情形使用源自双线性
//!   曲面近似的 9:3:3:1 角点叉积加权
//! - **方向传导率**: `-K·S`，基函数梯度与之点乘得到通量贡献

use glam::{DMat3, DVec3};
use pf_foundation::prelude::*;
use pf_mesh::Mesh;

/// 界面上与角点相邻的两条边的中点
///
/// 角点循环序下，前驱边中点在先、后继边中点在后。
/// 两点界面（二维线段）退化为线段中点。
pub fn half_edge_points(mesh: &Mesh, iface: usize, point: usize) -> PfResult<(DVec3, DVec3)> {
    let corners = &mesh.interface(iface).corners;
    let n = corners.len();
    let pos = corners.iter().position(|&c| c == point).ok_or_else(|| {
        PfError::internal(format!("角点 {point} 不在界面 {iface} 的角点列表中"))
    })?;

    let p = mesh.point_coord(point);
    if n == 2 {
        let other = mesh.point_coord(corners[1 - pos]);
        let mid = 0.5 * (p + other);
        return Ok((mid, mid));
    }

    let prev = mesh.point_coord(corners[(pos + n - 1) % n]);
    let next = mesh.point_coord(corners[(pos + 1) % n]);
    Ok((0.5 * (p + prev), 0.5 * (p + next)))
}

/// 角点处的子面面积（标量）
///
/// 四边形扇 {界面中心, 半边₁, 角点, 半边₂} 的面积，按两个三角形
/// 的叉积面积求和。两点界面取半段长度。
pub fn sub_face_area(mesh: &Mesh, iface: usize, point: usize) -> PfResult<Scalar> {
    let interface = mesh.interface(iface);
    if interface.corners.len() == 2 {
        let a = mesh.point_coord(interface.corners[0]);
        let b = mesh.point_coord(interface.corners[1]);
        return Ok(0.5 * (b - a).length());
    }

    let (he1, he2) = half_edge_points(mesh, iface, point)?;
    let c = interface.center;
    let p = mesh.point_coord(point);
    let t1 = 0.5 * (he1 - c).cross(p - c).length();
    let t2 = 0.5 * (p - c).cross(he2 - c).length();
    Ok(t1 + t2)
}

/// 角点处的子面法向面积（向量）
///
/// 在角点子面上积分近似外法向，返回方向沿归属单元外法向、
/// 模长为子面面积的向量。
///
/// - 2 点界面: 单位法向 × 半段长度
/// - 3 点界面: 三角形面积向量的 1/3（重心细分）
/// - 4 点界面: 双线性曲面在角点四分之一参数域上的精确积分，
///   即角点叉积的 9:3:3:1 加权
/// - 一般多边形: 四边形扇的两个三角形面积向量之和
pub fn sub_face_normal_area(mesh: &Mesh, iface: usize, point: usize) -> PfResult<DVec3> {
    let interface = mesh.interface(iface);
    let corners = &interface.corners;

    let raw = match corners.len() {
        2 => {
            let a = mesh.point_coord(corners[0]);
            let b = mesh.point_coord(corners[1]);
            interface.normal * (0.5 * (b - a).length())
        }
        3 => {
            let q0 = mesh.point_coord(corners[0]);
            let q1 = mesh.point_coord(corners[1]);
            let q2 = mesh.point_coord(corners[2]);
            (q1 - q0).cross(q2 - q0) / 6.0
        }
        4 => {
            let pos = corners.iter().position(|&c| c == point).ok_or_else(|| {
                PfError::internal(format!("角点 {point} 不在界面 {iface} 的角点列表中"))
            })?;
            // 旋转角点序使 p 为首位（权重 9 的角点）
            let q: [DVec3; 4] = std::array::from_fn(|i| {
                mesh.point_coord(corners[(pos + i) % 4])
            });
            let a0 = (q[1] - q[0]).cross(q[3] - q[0]);
            let a1 = (q[1] - q[0]).cross(q[2] - q[1]);
            let a3 = (q[2] - q[3]).cross(q[3] - q[0]);
            let a2 = (q[2] - q[3]).cross(q[2] - q[1]);
            (9.0 * a0 + 3.0 * a1 + 3.0 * a3 + a2) / 64.0
        }
        _ => {
            let (he1, he2) = half_edge_points(mesh, iface, point)?;
            let c = interface.center;
            let p = mesh.point_coord(point);
            0.5 * (he1 - c).cross(p - c) + 0.5 * (p - c).cross(he2 - c)
        }
    };

    // 统一定向到归属单元外法向
    if raw.dot(interface.normal) < 0.0 {
        Ok(-raw)
    } else {
        Ok(raw)
    }
}

/// 方向传导率：`-K·S`
///
/// 基函数梯度与该向量点乘即得到通过子面的通量贡献。
#[inline]
pub fn directional_conductivity(tensor: &DMat3, normal_area: DVec3) -> DVec3 {
    -(*tensor * normal_area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductivity::diagonal_tensor;
    use pf_mesh::CartesianMeshBuilder;

    fn unit_cube() -> Mesh {
        CartesianMeshBuilder::new(1, 1, 1).build().unwrap()
    }

    #[test]
    fn test_half_edge_points_quad() {
        let mesh = unit_cube();
        // 找 +x 界面
        let iface = (0..mesh.n_interfaces())
            .find(|&f| mesh.interface(f).normal.dot(DVec3::X) > 0.5)
            .unwrap();
        let corner = mesh.interface(iface).corners[0];
        let (he1, he2) = half_edge_points(&mesh, iface, corner).unwrap();
        let p = mesh.point_coord(corner);
        // 半边中点与角点距离为半边长
        assert!(((he1 - p).length() - 0.5).abs() < 1e-12);
        assert!(((he2 - p).length() - 0.5).abs() < 1e-12);
        // 两个半边中点不同
        assert!((he1 - he2).length() > 0.5);
    }

    #[test]
    fn test_sub_face_area_quarter() {
        let mesh = unit_cube();
        for f in 0..mesh.n_interfaces() {
            for &p in &mesh.interface(f).corners {
                let a = sub_face_area(&mesh, f, p).unwrap();
                assert!((a - 0.25).abs() < 1e-12, "子面面积应为 1/4: {a}");
            }
        }
    }

    #[test]
    fn test_sub_face_normal_area_bilinear_quad() {
        let mesh = unit_cube();
        for f in 0..mesh.n_interfaces() {
            let iface = mesh.interface(f);
            let mut total = DVec3::ZERO;
            for &p in &iface.corners {
                let s = sub_face_normal_area(&mesh, f, p).unwrap();
                // 定向沿外法向
                assert!(s.dot(iface.normal) > 0.0);
                // 平面四边形: 模长即子面面积
                assert!((s.length() - 0.25).abs() < 1e-12);
                total += s;
            }
            // 四个角点子面覆盖整个界面
            assert!((total - iface.normal * iface.area).length() < 1e-12);
        }
    }

    #[test]
    fn test_directional_conductivity() {
        let k = diagonal_tensor(2.0, 1.0, 1.0);
        let s = DVec3::new(0.25, 0.0, 0.0);
        let omega = directional_conductivity(&k, s);
        assert!((omega - DVec3::new(-0.5, 0.0, 0.0)).length() < 1e-15);
    }
}
