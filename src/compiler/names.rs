/// Source of candidate names for generated storage.
///
/// The compiler discards candidates that are already taken, so a source
/// only has to keep producing new candidates.
pub trait NameSource {
    fn next_name(&mut self) -> String;
}

/// Deterministic `prefix1`, `prefix2`, ... sequence.
#[derive(Clone, Debug)]
pub struct Counter {
    prefix: String,
    next: u64,
}

impl Counter {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 1,
        }
    }
}

impl NameSource for Counter {
    fn next_name(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_sequence() {
        let mut c = Counter::new("temp_");
        assert_eq!(c.next_name(), "temp_1");
        assert_eq!(c.next_name(), "temp_2");
    }
}
