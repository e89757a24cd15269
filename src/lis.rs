//! Longest increasing subsequence over old positions, used to find the units that can stay where they are.

/// Returns the indices into `positions` that form a longest strictly increasing run of old positions.
///
/// Entries before `start` and [`None`] entries (new items without an old position) are skipped.
/// The result is ascending.
///
/// This is patience sorting in *O(n log n)*: `tails[k]` holds the smallest old position
/// that ends a run of length `k + 1`, `predecessors` links each candidate to the run it extends.
#[must_use]
pub fn longest_increasing_subsequence(positions: &[Option<usize>], start: usize) -> Vec<usize> {
	let mut tails: Vec<usize> = Vec::new();
	let mut tail_indices: Vec<usize> = Vec::new();
	let mut predecessors: Vec<Option<usize>> = vec![None; positions.len()];

	for (i, position) in positions.iter().enumerate().skip(start) {
		let n = match *position {
			Some(n) => n,
			None => continue,
		};

		let j = find_greatest_index_leq(&tails, n);
		if let Some(j) = j {
			predecessors[i] = Some(tail_indices[j]);
		}

		let next = j.map_or(0, |j| j + 1);
		if next == tails.len() {
			tails.push(n);
			tail_indices.push(i);
		} else if n < tails[next] {
			tails[next] = n;
			tail_indices[next] = i;
		}
	}

	let mut result = vec![0; tail_indices.len()];
	let mut cursor = tail_indices.last().copied();
	for slot in result.iter_mut().rev() {
		match cursor {
			Some(i) => {
				*slot = i;
				cursor = predecessors[i];
			}
			None => break,
		}
	}
	result
}

/// Finds the greatest index in the ascending `seq` whose value is `<= n`.
///
/// Checks the last value first, since increasing inputs are by far the most common.
#[must_use]
pub fn find_greatest_index_leq(seq: &[usize], n: usize) -> Option<usize> {
	// lo (once set) points at a value <= n, hi at a value > n.
	let mut lo: Option<usize> = None;
	let mut hi = seq.len();

	match seq.last() {
		Some(&last) if last <= n => return Some(seq.len() - 1),
		_ => (),
	}

	loop {
		let lo_bound = lo.map_or(0, |lo| lo + 1);
		if lo_bound >= hi {
			break lo;
		}
		let mid = lo_bound + (hi - lo_bound) / 2;
		if seq[mid] > n {
			hi = mid;
		} else {
			lo = Some(mid);
		}
	}
}
