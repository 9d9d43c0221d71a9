use super::*;

#[test]
fn test_cosine_identical_and_orthogonal() {
    assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
}

#[test]
fn test_cosine_degenerate_inputs() {
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
}

#[test]
fn test_matrix_layout_is_row_major() {
    let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let cols = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]];
    let m = similarity_matrix(&rows, &cols, 500);

    assert_eq!(m.len(), 6);
    assert!((m[0] - 1.0).abs() < 1e-6);
    assert!((m[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    assert_eq!(m[2], 0.0);
    assert_eq!(m[3], 0.0);
    assert!((m[5] - 1.0).abs() < 1e-6);
}

#[test]
fn test_matrix_chunking_does_not_change_result() {
    let rows: Vec<Vec<f32>> = (0..23)
        .map(|i| vec![i as f32, (i % 5) as f32, 1.0])
        .collect();
    let cols: Vec<Vec<f32>> = (0..7).map(|j| vec![1.0, j as f32, (j * j) as f32]).collect();

    let whole = similarity_matrix(&rows, &cols, 1000);
    for chunk in [1, 2, 5, 22, 23] {
        assert_eq!(similarity_matrix(&rows, &cols, chunk), whole);
    }
}

#[test]
fn test_matrix_empty_axes() {
    let rows: Vec<Vec<f32>> = vec![vec![1.0]];
    let cols: Vec<Vec<f32>> = vec![];
    assert!(similarity_matrix(&rows, &cols, 10).is_empty());
    assert!(similarity_matrix(&cols, &rows, 0).is_empty());
}

#[test]
fn test_top_k_breaks_ties_by_index() {
    let ranked = top_k(vec![(3, 0.5), (1, 0.9), (0, 0.5), (2, 0.1)], 3);
    assert_eq!(ranked, vec![(1, 0.9), (0, 0.5), (3, 0.5)]);
}
