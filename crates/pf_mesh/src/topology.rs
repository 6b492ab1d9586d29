// crates/pf_mesh/src/topology.rs

//! 网格关联性数据结构
//!
//! 提供 CSR (Compressed Sparse Row) 格式的关联性存储，用于
//! 角点→界面、角点→单元等一对多关系。
//!
//! # 设计说明
//!
//! - `offsets[i]` 和 `offsets[i+1]` 之间的元素是第 i 行的内容
//! - 内存紧凑，缓存友好
//! - 适合只读迭代，不适合动态修改
//!
//! # 示例
//!
//! ```
//! use pf_mesh::topology::CsrConnectivity;
//!
//! let mut builder = CsrConnectivity::with_rows(3);
//! builder.push(0, 5);
//! builder.push(1, 2);
//! builder.push(0, 3);
//! let csr = builder.build_sorted();
//!
//! assert_eq!(csr.row(0), &[3, 5]);
//! assert_eq!(csr.row(1), &[2]);
//! assert_eq!(csr.row(2), &[] as &[usize]);
//! ```

use serde::{Deserialize, Serialize};

/// CSR 格式关联性
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsrConnectivity {
    /// 行偏移数组，长度 = n_rows + 1
    offsets: Vec<usize>,
    /// 列索引数组，长度 = 非零元素数
    indices: Vec<usize>,
}

impl CsrConnectivity {
    /// 从偏移与索引数组创建
    pub fn new(offsets: Vec<usize>, indices: Vec<usize>) -> Self {
        debug_assert!(!offsets.is_empty(), "offsets 至少包含一个元素");
        debug_assert_eq!(
            offsets.last().copied().unwrap_or(0),
            indices.len(),
            "末偏移必须等于索引数组长度"
        );
        Self { offsets, indices }
    }

    /// 创建逐行累积构建器
    pub fn with_rows(n_rows: usize) -> CsrBuilder {
        CsrBuilder {
            rows: vec![Vec::new(); n_rows],
        }
    }

    /// 获取第 row 行的切片
    #[inline]
    pub fn row(&self, row: usize) -> &[usize] {
        &self.indices[self.offsets[row]..self.offsets[row + 1]]
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// 非零元素总数
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// 第 row 行的元素个数
    #[inline]
    pub fn row_len(&self, row: usize) -> usize {
        self.offsets[row + 1] - self.offsets[row]
    }

    /// 迭代所有行
    pub fn iter_rows(&self) -> impl Iterator<Item = &[usize]> {
        (0..self.n_rows()).map(move |i| self.row(i))
    }
}

/// CSR 构建器：先按行累积，再压缩
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    rows: Vec<Vec<usize>>,
}

impl CsrBuilder {
    /// 向第 row 行追加一个索引
    pub fn push(&mut self, row: usize, index: usize) {
        self.rows[row].push(index);
    }

    /// 压缩为 CSR，各行排序并去重
    pub fn build_sorted(mut self) -> CsrConnectivity {
        let mut offsets = Vec::with_capacity(self.rows.len() + 1);
        let mut indices = Vec::new();
        offsets.push(0);
        for row in &mut self.rows {
            row.sort_unstable();
            row.dedup();
            indices.extend_from_slice(row);
            offsets.push(indices.len());
        }
        CsrConnectivity::new(offsets, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sorts_and_dedups() {
        let mut b = CsrConnectivity::with_rows(2);
        b.push(0, 4);
        b.push(0, 1);
        b.push(0, 4);
        b.push(1, 0);
        let csr = b.build_sorted();

        assert_eq!(csr.row(0), &[1, 4]);
        assert_eq!(csr.row(1), &[0]);
        assert_eq!(csr.n_rows(), 2);
        assert_eq!(csr.nnz(), 3);
    }

    #[test]
    fn test_empty_rows() {
        let csr = CsrConnectivity::with_rows(3).build_sorted();
        assert_eq!(csr.n_rows(), 3);
        assert_eq!(csr.nnz(), 0);
        assert_eq!(csr.row_len(1), 0);
    }

    #[test]
    fn test_iter_rows() {
        let csr = CsrConnectivity::new(vec![0, 2, 3], vec![7, 8, 9]);
        let rows: Vec<&[usize]> = csr.iter_rows().collect();
        assert_eq!(rows, vec![&[7usize, 8][..], &[9usize][..]]);
    }
}
