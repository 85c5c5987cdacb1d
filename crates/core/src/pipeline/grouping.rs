use std::num::NonZeroUsize;

/// Splits `items` into contiguous groups of `size`, preserving order.
///
/// Every group holds exactly `size` items except possibly the last, which
/// holds the remainder. An empty input yields no groups.
pub fn split_into_groups<T>(items: &[T], size: NonZeroUsize) -> Vec<&[T]> {
    items.chunks(size.get()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_three_items_in_pairs() {
        let items = ["img1", "img2", "img3"];
        let groups = split_into_groups(&items, size(2));
        assert_eq!(groups, vec![&["img1", "img2"][..], &["img3"][..]]);
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        assert!(split_into_groups::<u8>(&[], size(4)).is_empty());
    }

    #[rstest]
    fn test_grouping_invariant(
        #[values(0, 1, 2, 7, 8, 9, 64)] n: usize,
        #[values(1, 2, 3, 8, 100)] g: usize,
    ) {
        let items: Vec<usize> = (0..n).collect();
        let groups = split_into_groups(&items, size(g));

        assert_eq!(groups.len(), n.div_ceil(g));
        assert_eq!(groups.concat(), items);
        if let Some((last, rest)) = groups.split_last() {
            assert!(rest.iter().all(|grp| grp.len() == g));
            assert!((1..=g).contains(&last.len()));
        }
    }
}
