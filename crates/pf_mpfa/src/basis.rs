// crates/pf_mpfa/src/basis.rs

//! 仿射基函数
//!
//! 每个交互区域内，每个单元解一个小型稠密线性系统获得基数基：
//! 在一个连续性点（或单元中心）取 1、其余取 0 的仿射场
//! ψ(x,y,z) = c₁ + c₂x + c₃y + c₄z。
//!
//! - 3 个插值点（二维情形，单元在顶点处只有 2 个区域界面）：
//!   以三点平面的法向梯度为零的约束行封闭 4×4 系统
//! - 4 个插值点（三维情形）：标准点插值
//!
//! 插值点共线/共面时系统奇异，以退化系统错误向上传播。

use glam::DVec3;
use nalgebra::Matrix4;
use pf_foundation::prelude::*;

/// 仿射场 ψ(x,y,z) = c₁ + c₂x + c₃y + c₄z
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineBasis3D {
    coeffs: [Scalar; 4],
}

impl AffineBasis3D {
    /// 从系数创建
    pub fn new(coeffs: [Scalar; 4]) -> Self {
        Self { coeffs }
    }

    /// 场在给定点的取值
    #[inline]
    pub fn value(&self, p: DVec3) -> Scalar {
        self.coeffs[0] + self.coeffs[1] * p.x + self.coeffs[2] * p.y + self.coeffs[3] * p.z
    }

    /// 常梯度 (c₂, c₃, c₄)
    #[inline]
    pub fn gradient(&self) -> DVec3 {
        DVec3::new(self.coeffs[1], self.coeffs[2], self.coeffs[3])
    }
}

/// 构造基数基
///
/// `points[0]` 为单元中心，其余为连续性点（2 或 3 个）。返回与
/// 插值点一一对应的基数基：基 j 在 `points[j]` 取 1、其余取 0。
pub fn cardinal_bases(element: usize, points: &[DVec3]) -> PfResult<Vec<AffineBasis3D>> {
    let n = points.len();
    if n != 3 && n != 4 {
        return Err(PfError::degenerate_element(
            element,
            format!("基函数插值点数必须为 3 或 4: {n}"),
        ));
    }

    let mut m = Matrix4::<Scalar>::zeros();
    for (i, p) in points.iter().enumerate() {
        m[(i, 0)] = 1.0;
        m[(i, 1)] = p.x;
        m[(i, 2)] = p.y;
        m[(i, 3)] = p.z;
    }
    if n == 3 {
        // 二维情形：梯度限制在三点平面内
        let normal = (points[1] - points[0]).cross(points[2] - points[0]);
        if normal.length() < DISTANCE_EPSILON {
            return Err(PfError::degenerate_element(element, "连续性点共线"));
        }
        m[(3, 1)] = normal.x;
        m[(3, 2)] = normal.y;
        m[(3, 3)] = normal.z;
    }

    let inv = m.try_inverse().ok_or_else(|| {
        PfError::degenerate_element(element, "基函数插值矩阵奇异（连续性点共面或重合）")
    })?;

    // 基 j 的系数解 M·c = e_j，即逆矩阵第 j 列
    Ok((0..n)
        .map(|j| AffineBasis3D::new([inv[(0, j)], inv[(1, j)], inv[(2, j)], inv[(3, j)]]))
        .collect())
}

// ============================================================
// 区域未知量上的线性型
// ============================================================

/// 区域未知量 (单元势 φ, 连接连续性势 v) 上的线性型
///
/// L 族格式把部分连续性点的势通过其他单元的基函数代换掉；代换后
/// 每个"势槽位"都是区域未知量的线性组合，以该结构表示并在矩阵
/// 装配时直接展开到 A/B/C/D。
#[derive(Debug, Clone, PartialEq)]
pub struct LinearForm {
    /// 单元势系数
    pub cells: Vec<Scalar>,
    /// 连接连续性势系数
    pub conns: Vec<Scalar>,
}

impl LinearForm {
    /// 全零线性型
    pub fn zeros(n_cells: usize, n_conns: usize) -> Self {
        Self {
            cells: vec![0.0; n_cells],
            conns: vec![0.0; n_conns],
        }
    }

    /// 第 i 个单元势的单位线性型
    pub fn cell(n_cells: usize, n_conns: usize, i: usize) -> Self {
        let mut form = Self::zeros(n_cells, n_conns);
        form.cells[i] = 1.0;
        form
    }

    /// 第 m 个连接势的单位线性型
    pub fn conn(n_cells: usize, n_conns: usize, m: usize) -> Self {
        let mut form = Self::zeros(n_cells, n_conns);
        form.conns[m] = 1.0;
        form
    }

    /// 累加 `factor × other`
    pub fn add_scaled(&mut self, other: &LinearForm, factor: Scalar) {
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += factor * b;
        }
        for (a, b) in self.conns.iter_mut().zip(&other.conns) {
            *a += factor * b;
        }
    }

    /// 全体系数缩放
    pub fn scale(&mut self, factor: Scalar) {
        for a in &mut self.cells {
            *a *= factor;
        }
        for a in &mut self.conns {
            *a *= factor;
        }
    }
}

/// 单元的区域内仿射场
///
/// 基数基与各槽位线性型的配对：场 = Σⱼ (槽位 j 的势) × ψⱼ，
/// 槽位势以 [`LinearForm`] 表示。
#[derive(Debug, Clone)]
pub struct ElementField {
    bases: Vec<AffineBasis3D>,
    forms: Vec<LinearForm>,
}

impl ElementField {
    /// 从基数基与槽位线性型创建
    pub fn new(bases: Vec<AffineBasis3D>, forms: Vec<LinearForm>) -> Self {
        debug_assert_eq!(bases.len(), forms.len());
        Self { bases, forms }
    }

    /// 场在给定点的取值（线性型）
    pub fn value_form(&self, p: DVec3) -> LinearForm {
        let mut out = LinearForm::zeros(self.forms[0].cells.len(), self.forms[0].conns.len());
        for (basis, form) in self.bases.iter().zip(&self.forms) {
            out.add_scaled(form, basis.value(p));
        }
        out
    }

    /// 场梯度与方向传导率点乘得到的通量贡献（线性型）
    pub fn flux_form(&self, omega: DVec3) -> LinearForm {
        let mut out = LinearForm::zeros(self.forms[0].cells.len(), self.forms[0].conns.len());
        for (basis, form) in self.bases.iter().zip(&self.forms) {
            out.add_scaled(form, omega.dot(basis.gradient()));
        }
        out
    }
}
