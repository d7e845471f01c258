//! Port algebra
//!
//! Structural edits of a matrix's port set: add, delete, rename, and
//! swap ports, plus block-combining several matrices into one and
//! splitting one back apart.

use std::collections::BTreeMap;

use num_complex::Complex64;

use super::core::{pair_key, pair_ports, MatrixError, NetworkParameterMatrix, Wave};

impl NetworkParameterMatrix {
    /// Extend the port set with `n`.
    ///
    /// Newly implied (wave, port-pair) columns start out NaN; existing
    /// columns are untouched. Adding a port already present is a no-op.
    pub fn add_port(&mut self, n: u32) {
        if self.ports().contains(&n) {
            return;
        }
        let columns = self.to_columns();
        let mut ports = self.ports().to_vec();
        ports.push(n);
        self.rebuild_ports(ports, &columns);
    }

    /// Remove `n` from the port set.
    ///
    /// Drops every column whose pair key references `n` as either the
    /// destination or the source port, and returns the removed columns
    /// so callers can recover the data.
    pub fn delete_port(
        &mut self,
        n: u32,
    ) -> Result<Vec<((Wave, u32), Vec<Complex64>)>, MatrixError> {
        if !self.ports().contains(&n) {
            return Err(MatrixError::Port(n));
        }

        let mut columns = self.to_columns();
        let doomed: Vec<(Wave, u32)> = columns
            .keys()
            .filter(|(_, p)| {
                let (i, j) = pair_ports(*p);
                i == n || j == n
            })
            .copied()
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for key in doomed {
            if let Some(col) = columns.remove(&key) {
                removed.push((key, col));
            }
        }

        let ports: Vec<u32> = self.ports().iter().copied().filter(|&p| p != n).collect();
        self.rebuild_ports(ports, &columns);
        Ok(removed)
    }

    /// Rename ports according to `mapping`.
    ///
    /// Only columns whose pair key actually changes are touched. A
    /// partial one-directional map is destructive by design: columns
    /// resolving to port combinations the new port set does not track
    /// are dropped, and colliding renames resolve in ascending old-key
    /// order with the later insert winning.
    pub fn map_ports(&mut self, mapping: &BTreeMap<u32, u32>) -> Result<(), MatrixError> {
        for &from in mapping.keys() {
            if !self.ports().contains(&from) {
                return Err(MatrixError::Port(from));
            }
        }

        let rename = |p: u32| mapping.get(&p).copied().unwrap_or(p);
        let ports: Vec<u32> = self.ports().iter().map(|&p| rename(p)).collect();

        let columns = self.to_columns();
        let mut renamed: BTreeMap<(Wave, u32), Vec<Complex64>> = BTreeMap::new();
        // Untouched keys first so that changed keys overwrite on collision.
        for ((w, p), col) in &columns {
            let (i, j) = pair_ports(*p);
            if (rename(i), rename(j)) == (i, j) {
                renamed.insert((*w, *p), col.clone());
            }
        }
        for ((w, p), col) in &columns {
            let (i, j) = pair_ports(*p);
            let key = pair_key(rename(i), rename(j));
            if key != *p {
                renamed.insert((*w, key), col.clone());
            }
        }

        self.rebuild_ports(ports, &renamed);
        Ok(())
    }

    /// Exchange two ports: `map_ports({a: b, b: a})`.
    pub fn swap_ports(&mut self, a: u32, b: u32) -> Result<(), MatrixError> {
        let mut mapping = BTreeMap::new();
        mapping.insert(a, b);
        mapping.insert(b, a);
        self.map_ports(&mapping)
    }
}

/// Block-combine matrices into a single matrix.
///
/// All inputs must share the frequency axis and wave set. Each input is
/// assigned a contiguous block of port numbers in argument order
/// (consecutive numbering from 1), its data is copied into that block,
/// and every cross-block column is filled with `fill`.
pub fn combine_parameters(
    inputs: &[&NetworkParameterMatrix],
    fill: Complex64,
) -> Result<NetworkParameterMatrix, MatrixError> {
    let first = inputs
        .first()
        .ok_or_else(|| MatrixError::ShapeMismatch("no matrices to combine".into()))?;

    for m in &inputs[1..] {
        if m.frequencies() != first.frequencies() {
            return Err(MatrixError::ShapeMismatch(
                "combine requires identical frequency axes".into(),
            ));
        }
        if m.waves() != first.waves() {
            return Err(MatrixError::ShapeMismatch(
                "combine requires identical wave sets".into(),
            ));
        }
    }

    let total: usize = inputs.iter().map(|m| m.num_ports()).sum();
    let npoints = first.npoints();

    let mut columns: BTreeMap<(Wave, u32), Vec<Complex64>> = BTreeMap::new();
    let mut offset = 0u32;
    for m in inputs {
        let block = m.ports().to_vec();
        let renumber = |p: u32| {
            let rank = block.iter().position(|&q| q == p).unwrap_or(0) as u32;
            offset + rank + 1
        };
        for ((w, p), col) in m.to_columns() {
            let (i, j) = pair_ports(p);
            columns.insert((w, pair_key(renumber(i), renumber(j))), col);
        }
        offset += m.num_ports() as u32;
    }

    let mut out = NetworkParameterMatrix::with_port_count(
        total,
        first.waves().to_vec(),
        first.frequencies().to_vec(),
        first.header,
    );
    let fill_col = vec![fill; npoints];
    let waves = out.waves().to_vec();
    let pairs = out.pairs().to_vec();
    for &w in &waves {
        for &p in &pairs {
            let col = columns.get(&(w, p)).unwrap_or(&fill_col);
            out.set_column(w, p, col)?;
        }
    }
    Ok(out)
}

/// Partition a matrix into `n` equal contiguous port blocks.
///
/// Inverse of [`combine_parameters`] for the equal-partition case. Each
/// output keeps only its block's self-referencing columns, renumbered
/// from port 1.
pub fn split_parameters(
    m: &NetworkParameterMatrix,
    n: usize,
) -> Result<Vec<NetworkParameterMatrix>, MatrixError> {
    if n == 0 || m.num_ports() % n != 0 {
        return Err(MatrixError::ShapeMismatch(format!(
            "{} ports cannot be split into {} equal blocks",
            m.num_ports(),
            n
        )));
    }

    let block_size = m.num_ports() / n;
    let columns = m.to_columns();
    let mut outputs = Vec::with_capacity(n);

    for block in m.ports().chunks(block_size) {
        let renumber = |p: u32| block.iter().position(|&q| q == p).map(|r| r as u32 + 1);
        let mut sub = NetworkParameterMatrix::with_port_count(
            block_size,
            m.waves().to_vec(),
            m.frequencies().to_vec(),
            m.header,
        );
        for ((w, p), col) in &columns {
            let (i, j) = pair_ports(*p);
            if let (Some(ni), Some(nj)) = (renumber(i), renumber(j)) {
                sub.set_column(*w, pair_key(ni, nj), col)?;
            }
        }
        outputs.push(sub);
    }
    Ok(outputs)
}
