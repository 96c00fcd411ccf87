use event_service::seatmap::{generate_labels, row_label};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    // Exactly N labels, all distinct, for any seat count and row width.
    #[test]
    fn label_count_and_uniqueness(total in 1usize..2_000, width in 1usize..600) {
        let labels = generate_labels(total, width);
        prop_assert_eq!(labels.len(), total);

        let unique: HashSet<&String> = labels.iter().collect();
        prop_assert_eq!(unique.len(), total);
    }

    // Same inputs, same output, independent of anything ambient.
    #[test]
    fn generation_is_pure(total in 1usize..500, width in 1usize..100) {
        prop_assert_eq!(generate_labels(total, width), generate_labels(total, width));
    }

    // Every label is a row prefix from the Excel scheme plus a position
    // within the configured row width.
    #[test]
    fn labels_respect_row_width(total in 1usize..1_000, width in 1usize..200) {
        for label in generate_labels(total, width) {
            let split = label.find(|c: char| c.is_ascii_digit()).unwrap();
            let (row, position) = label.split_at(split);
            prop_assert!(!row.is_empty());
            prop_assert!(row.chars().all(|c| c.is_ascii_uppercase()));
            let position: usize = position.parse().unwrap();
            prop_assert!(position >= 1 && position <= width);
        }
    }

    // Row labels are distinct across a wide index range.
    #[test]
    fn row_labels_are_distinct(a in 0usize..10_000, b in 0usize..10_000) {
        if a != b {
            prop_assert_ne!(row_label(a), row_label(b));
        }
    }
}

#[test]
fn full_rows_then_remainder() {
    let labels = generate_labels(120, 50);
    assert_eq!(labels[0], "A1");
    assert_eq!(labels[49], "A50");
    assert_eq!(labels[50], "B1");
    assert_eq!(labels[99], "B50");
    assert_eq!(labels[100], "C1");
    assert_eq!(labels[119], "C20");
}

#[test]
fn row_scheme_wraps_past_z() {
    assert_eq!(row_label(25), "Z");
    assert_eq!(row_label(26), "AA");
    assert_eq!(row_label(26 + 26 * 26 - 1), "ZZ");
    assert_eq!(row_label(26 + 26 * 26), "AAA");
}
