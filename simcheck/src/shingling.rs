/// Iterator over all contiguous windows of `min_n..=max_n` tokens,
/// shorter windows first (all unigrams, then all bigrams, and so on).
pub struct ShingleIter<'a, T> {
    tokens: &'a [T],
    window_size: usize,
    max_n: usize,
    position: usize,
}

impl<'a, T> ShingleIter<'a, T> {
    pub fn new(tokens: &'a [T], min_n: usize, max_n: usize) -> Self {
        assert!(1 <= min_n && min_n <= max_n);
        Self {
            tokens,
            window_size: min_n,
            max_n,
            position: 0,
        }
    }
}

impl<'a, T> Iterator for ShingleIter<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        while self.window_size <= self.max_n {
            if self.position + self.window_size <= self.tokens.len() {
                let window = &self.tokens[self.position..self.position + self.window_size];
                self.position += 1;
                return Some(window);
            }
            self.window_size += 1;
            self.position = 0;
        }
        None
    }
}
