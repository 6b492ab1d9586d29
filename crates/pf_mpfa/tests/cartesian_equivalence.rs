// crates/pf_mpfa/tests/cartesian_equivalence.rs

//! 笛卡尔网格上的格式等价性
//!
//! 正交、轴对齐、均质网格上 O_MPFA、L_MPFA、L4_MPFA 与 TPFA 应
//! 在容差内给出完全相同的两点模板（每条连接仅两个非零条目）。

use glam::DMat3;
use pf_mesh::{CartesianMeshBuilder, Mesh};
use pf_mpfa::conductivity::diagonal_tensor;
use pf_mpfa::{
    Conductivity, MpfaConfig, SchemeKind, TransmissibilityComputer, TransmissibilityTable,
    UniformConductivity,
};

const SCHEMES: [SchemeKind; 4] = [
    SchemeKind::Tpfa,
    SchemeKind::OMethod,
    SchemeKind::LMethod,
    SchemeKind::L4Method,
];

fn compute(mesh: &Mesh, k: &dyn Conductivity, scheme: SchemeKind) -> TransmissibilityTable {
    TransmissibilityComputer::new(
        MpfaConfig::default()
            .with_scheme(scheme)
            .with_uniform_flow_check(false)
            .with_parallel(false),
    )
    .unwrap()
    .calculate(mesh, k)
    .unwrap()
}

fn assert_two_point_tables_match(mesh: &Mesh, k: &dyn Conductivity) {
    let reference = compute(mesh, k, SchemeKind::Tpfa);

    for scheme in SCHEMES {
        let table = compute(mesh, k, scheme);
        for (ci, conn) in mesh.connections().iter().enumerate() {
            let stencil = table.stencil(ci);
            let expected = reference.stencil(ci).coefficient(conn.element_here);

            assert!(
                (stencil.coefficient(conn.element_here) - expected).abs() < 1e-9,
                "{:?} 连接 {ci} here 系数 {} != TPFA {}",
                scheme,
                stencil.coefficient(conn.element_here),
                expected
            );
            assert!(
                (stencil.coefficient(conn.element_there) + expected).abs() < 1e-9,
                "{:?} 连接 {ci} there 系数不匹配",
                scheme
            );
            // 两点性: 其余单元系数接近零
            for entry in stencil.entries() {
                if entry.element != conn.element_here && entry.element != conn.element_there {
                    assert!(
                        entry.value.abs() < 1e-9,
                        "{:?} 连接 {ci} 存在交叉项 {}",
                        scheme,
                        entry.value
                    );
                }
            }
        }
    }
}

#[test]
fn test_unit_cube_grid_isotropic() {
    let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
    let k = UniformConductivity::isotropic(1.0);
    assert_two_point_tables_match(&mesh, &k);
}

#[test]
fn test_anisotropic_spacing() {
    let mesh = CartesianMeshBuilder::new(3, 2, 2)
        .with_spacing(2.0, 1.0, 0.5)
        .build()
        .unwrap();
    let k = UniformConductivity::isotropic(1.0);
    assert_two_point_tables_match(&mesh, &k);
}

#[test]
fn test_diagonal_anisotropic_conductivity() {
    // 对角张量与轴对齐网格: 仍是 K-正交情形，全部格式退化两点
    let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
    let k = UniformConductivity::new(diagonal_tensor(5.0, 2.0, 0.5));
    assert_two_point_tables_match(&mesh, &k);
}

#[test]
fn test_expected_coefficient_value() {
    // 2×2×2 单位网格: A = 1, d_i = d_j = 0.5 → t = 1.0
    let mesh = CartesianMeshBuilder::new(2, 2, 2).build().unwrap();
    let k = UniformConductivity::isotropic(1.0);
    for scheme in SCHEMES {
        let table = compute(&mesh, &k, scheme);
        for (ci, conn) in mesh.connections().iter().enumerate() {
            assert!(
                (table.stencil(ci).coefficient(conn.element_here) - 1.0).abs() < 1e-9,
                "{:?} 连接 {ci}",
                scheme
            );
        }
    }
}

#[test]
fn test_conservation_row_sums() {
    let mesh = CartesianMeshBuilder::new(3, 3, 3).build().unwrap();
    let k = UniformConductivity::new(DMat3::from_cols_array(&[
        2.0, 0.5, 0.3, //
        0.5, 1.5, 0.2, //
        0.3, 0.2, 1.0,
    ]));
    for scheme in SCHEMES {
        let table = compute(&mesh, &k, scheme);
        for (ci, stencil) in table.stencils().iter().enumerate() {
            assert!(
                stencil.row_sum().abs() < 1e-8,
                "{:?} 连接 {ci} 行和 {}",
                scheme,
                stencil.row_sum()
            );
        }
    }
}

#[test]
fn test_boundary_only_mesh_falls_back_to_tpfa() {
    // 2×1×1 网格无内部顶点: O/L/L4 全部经边界子面回退，
    // 子面面积按角点求和等于整面面积，与 TPFA 完全一致
    let mesh = CartesianMeshBuilder::new(2, 1, 1).build().unwrap();
    let k = UniformConductivity::isotropic(3.0);
    let reference = compute(&mesh, &k, SchemeKind::Tpfa);

    for scheme in SCHEMES {
        let table = compute(&mesh, &k, scheme);
        let conn = mesh.connection(0);
        assert!(
            (table.stencil(0).coefficient(conn.element_here)
                - reference.stencil(0).coefficient(conn.element_here))
            .abs()
                < 1e-12,
            "{:?}",
            scheme
        );
    }
}
