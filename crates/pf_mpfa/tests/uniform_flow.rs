// crates/pf_mpfa/tests/uniform_flow.rs

//! 均匀流复现
//!
//! 均匀传导率 + 仿射势场 p = g·x 下，每条内部连接（界面角点均不
//! 触及边界）的模板通量应在 1e-6 相对误差内复现解析通量
//! −(K·g)·n·A。各向同性单位场下即 −g·n·A。

use glam::{DMat3, DVec3};
use pf_mesh::{CartesianMeshBuilder, Mesh};
use pf_mpfa::computer::uniform_flow_check;
use pf_mpfa::{
    Conductivity, MpfaConfig, SchemeKind, TransmissibilityComputer, UniformConductivity,
};

fn interior_connections(mesh: &Mesh) -> Vec<usize> {
    (0..mesh.n_connections())
        .filter(|&ci| !mesh.connection_is_boundary_adjacent(ci))
        .collect()
}

fn assert_reproduces_affine(
    mesh: &Mesh,
    k: &(impl Conductivity + Copy),
    scheme: SchemeKind,
    gradient: DVec3,
) {
    let table = TransmissibilityComputer::new(
        MpfaConfig::default()
            .with_scheme(scheme)
            .with_uniform_flow_check(false)
            .with_parallel(false),
    )
    .unwrap()
    .calculate(mesh, k)
    .unwrap();

    let potentials: Vec<f64> = mesh
        .elements()
        .iter()
        .map(|e| gradient.dot(e.center))
        .collect();

    let interior = interior_connections(mesh);
    assert!(!interior.is_empty(), "测试网格需要内部连接");

    for ci in interior {
        let conn = mesh.connection(ci);
        let here = mesh.interface(conn.here);
        let analytic = -(k.tensor(conn.element_here) * gradient).dot(here.normal) * here.area;
        let stencil_flux = table.stencil(ci).apply(&potentials);

        let scale = analytic.abs().max(1e-12);
        assert!(
            (stencil_flux - analytic).abs() / scale < 1e-6,
            "{:?} 连接 {ci}: 模板 {} vs 解析 {}",
            scheme,
            stencil_flux,
            analytic
        );
    }
}

#[test]
fn test_isotropic_all_schemes() {
    let mesh = CartesianMeshBuilder::new(3, 3, 3).build().unwrap();
    let k = UniformConductivity::isotropic(1.0);
    let gradient = DVec3::new(0.7, -1.3, 0.4);

    for scheme in [
        SchemeKind::Tpfa,
        SchemeKind::OMethod,
        SchemeKind::LMethod,
        SchemeKind::L4Method,
    ] {
        assert_reproduces_affine(&mesh, &k, scheme, gradient);
    }
}

#[test]
fn test_full_tensor_multi_point_schemes() {
    // 满张量均匀场: 两点格式不一致（TPFA 只取 ‖K·n‖），多点格式
    // 应精确复现
    let mesh = CartesianMeshBuilder::new(3, 3, 3).build().unwrap();
    let k = UniformConductivity::new(DMat3::from_cols_array(&[
        2.0, 0.5, 0.3, //
        0.5, 1.5, 0.2, //
        0.3, 0.2, 1.0,
    ]));
    let gradient = DVec3::new(1.0, 0.5, -0.8);

    for scheme in [SchemeKind::OMethod, SchemeKind::LMethod, SchemeKind::L4Method] {
        assert_reproduces_affine(&mesh, &k, scheme, gradient);
    }
}

#[test]
fn test_stretched_grid() {
    let mesh = CartesianMeshBuilder::new(3, 3, 3)
        .with_spacing(3.0, 1.0, 0.25)
        .build()
        .unwrap();
    let k = UniformConductivity::isotropic(2.0);
    let gradient = DVec3::new(-0.4, 0.9, 1.1);

    for scheme in [SchemeKind::OMethod, SchemeKind::LMethod, SchemeKind::L4Method] {
        assert_reproduces_affine(&mesh, &k, scheme, gradient);
    }
}

#[test]
fn test_relaxed_continuity_parameter() {
    // η = 0.5 的 O 方法仍应复现仿射场
    let mesh = CartesianMeshBuilder::new(3, 3, 3).build().unwrap();
    let k = UniformConductivity::isotropic(1.0);
    let table = TransmissibilityComputer::new(
        MpfaConfig::default()
            .with_continuity(0.5)
            .with_uniform_flow_check(false)
            .with_parallel(false),
    )
    .unwrap()
    .calculate(&mesh, &k)
    .unwrap();

    assert_eq!(uniform_flow_check(&mesh, &k, &table, 123), 0);
}

#[test]
fn test_builtin_self_test_reports_zero_mismatches() {
    let mesh = CartesianMeshBuilder::new(4, 4, 4).build().unwrap();
    let k = UniformConductivity::isotropic(1.0);
    let table = TransmissibilityComputer::new(
        MpfaConfig::default()
            .with_scheme(SchemeKind::L4Method)
            .with_uniform_flow_check(false),
    )
    .unwrap()
    .calculate(&mesh, &k)
    .unwrap();

    for seed in [1, 42, 2024] {
        assert_eq!(uniform_flow_check(&mesh, &k, &table, seed), 0);
    }
}
