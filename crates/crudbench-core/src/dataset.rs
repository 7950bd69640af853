//! Benchmark dataset generation.

/// Generate `size` payloads named `Record 1` through `Record {size}`.
pub fn generate_dataset(size: usize) -> Vec<String> {
    (1..=size).map(|i| format!("Record {}", i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_dataset() {
        assert_eq!(
            generate_dataset(3),
            vec!["Record 1", "Record 2", "Record 3"]
        );
    }

    #[test]
    fn test_generate_empty_dataset() {
        assert!(generate_dataset(0).is_empty());
    }
}
