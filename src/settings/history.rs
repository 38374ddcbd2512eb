/// Bounded undo/redo stack of settings snapshots.
///
/// `index` points at the snapshot that matches the live state. Saving after an undo
/// discards the redo branch.
#[derive(Clone, Debug)]
pub struct History<T> {
	snapshots: Vec<T>,
	index: Option<usize>,
	capacity: usize,
}

impl<T: Clone> History<T> {
	pub fn new(capacity: usize) -> Self {
		Self {
			snapshots: Vec::new(),
			index: None,
			capacity: capacity.max(1),
		}
	}

	pub fn save(&mut self, state: T) {
		let keep = self.index.map_or(0, |i| i + 1);
		self.snapshots.truncate(keep);
		self.snapshots.push(state);
		if self.snapshots.len() > self.capacity {
			self.snapshots.remove(0);
		}
		self.index = Some(self.snapshots.len() - 1);
	}

	/// The snapshot to restore, if there is an earlier one.
	pub fn undo(&mut self) -> Option<T> {
		let i = self.index.filter(|&i| i > 0)? - 1;
		self.index = Some(i);
		Some(self.snapshots[i].clone())
	}

	pub fn redo(&mut self) -> Option<T> {
		let i = self.index.map_or(0, |i| i + 1);
		let state = self.snapshots.get(i)?.clone();
		self.index = Some(i);
		Some(state)
	}

	pub fn can_undo(&self) -> bool {
		self.index.is_some_and(|i| i > 0)
	}

	pub fn can_redo(&self) -> bool {
		self.index.map_or(0, |i| i + 1) < self.snapshots.len()
	}

	pub fn clear(&mut self) {
		self.snapshots.clear();
		self.index = None;
	}

	pub fn len(&self) -> usize {
		self.snapshots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshots.is_empty()
	}
}

impl<T: Clone> Default for History<T> {
	fn default() -> Self {
		Self::new(100)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn undo_redo_walks_the_stack() {
		let mut history = History::default();
		assert!(!history.can_undo());
		history.save(1);
		history.save(2);
		history.save(3);
		assert_eq!(history.undo(), Some(2));
		assert_eq!(history.undo(), Some(1));
		assert_eq!(history.undo(), None);
		assert!(history.can_redo());
		assert_eq!(history.redo(), Some(2));
		history.save(7);
		assert!(!history.can_redo());
		assert_eq!(history.len(), 3);
		assert_eq!(history.undo(), Some(2));
	}

	#[test]
	fn capacity_drops_the_oldest() {
		let mut history = History::new(2);
		for state in 0..5 {
			history.save(state);
		}
		assert_eq!(history.len(), 2);
		assert_eq!(history.undo(), Some(3));
		assert!(!history.can_undo());
		history.clear();
		assert!(history.is_empty());
		assert_eq!(history.redo(), None);
	}
}
