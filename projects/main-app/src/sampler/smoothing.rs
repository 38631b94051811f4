use std::collections::VecDeque;

/// Majority vote over the last few predicted labels. Ties go to the label
/// seen most recently. A window of one passes labels straight through.
#[derive(Debug)]
pub struct EmotionVote {
    window: VecDeque<String>,
    capacity: usize,
}

impl EmotionVote {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, label: String) -> String {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(label);

        let mut counts: Vec<(&str, usize)> = Vec::with_capacity(self.window.len());
        for label in self.window.iter().rev() {
            match counts.iter_mut().find(|(seen, _)| *seen == label.as_str()) {
                Some((_, count)) => *count += 1,
                None => counts.push((label.as_str(), 1)),
            }
        }

        // `counts` is ordered newest first; only a strictly higher count displaces it.
        let mut best = counts[0];
        for entry in &counts[1..] {
            if entry.1 > best.1 {
                best = *entry;
            }
        }
        best.0.to_owned()
    }
}
