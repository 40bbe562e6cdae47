mod helpers;

use dscvr::catalog::TrackRecord;
use dscvr::config::FeatureConfig;
use dscvr::embedding::{FeatureBuilder, TextEncoder};
use dscvr::error::DscvrError;
use helpers::{fixture_corpus, small_features};

#[test]
fn builds_are_deterministic() {
    let corpus = fixture_corpus();
    let (a, model_a) = FeatureBuilder::new(small_features())
        .fit_transform(&corpus)
        .unwrap();
    let (b, model_b) = FeatureBuilder::new(small_features())
        .fit_transform(&corpus)
        .unwrap();

    assert_eq!(a, b, "same corpus and seed must give identical matrices");
    assert_eq!(model_a.scale, model_b.scale);
    assert_eq!(model_a.tfidf.vocabulary, model_b.tfidf.vocabulary);
}

#[test]
fn matrix_rows_follow_corpus_order() {
    let corpus = fixture_corpus();
    let (matrix, model) = FeatureBuilder::new(small_features())
        .fit_transform(&corpus)
        .unwrap();

    assert_eq!(matrix.dim(), (corpus.len(), 6));
    for (i, record) in corpus.iter().enumerate() {
        assert_eq!(model.encode(record), matrix.row(i).to_vec());
    }
}

#[test]
fn scaled_columns_have_unit_or_zero_spread() {
    let (matrix, _) = FeatureBuilder::new(small_features())
        .fit_transform(&fixture_corpus())
        .unwrap();

    let n = matrix.nrows() as f64;
    for col in matrix.columns() {
        let values: Vec<f64> = col.iter().map(|v| *v as f64).collect();
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(
            (var - 1.0).abs() < 1e-3 || var < 1e-6,
            "column variance {var} is neither 1 nor 0"
        );
    }
}

#[test]
fn out_of_corpus_text_encodes_to_fixed_dims() {
    let (_, model) = FeatureBuilder::new(small_features())
        .fit_transform(&fixture_corpus())
        .unwrap();
    let v = model.encode_text("dreamy neo soul");
    assert_eq!(v.len(), model.dimensions());
    assert!(v.iter().any(|x| *x != 0.0));

    // Nothing in the vocabulary: the vector is all zeros.
    let unknown = model.encode_text("zzz qqq");
    assert!(unknown.iter().all(|x| *x == 0.0));
}

#[test]
fn empty_corpus_is_data_error() {
    let err = FeatureBuilder::new(small_features())
        .fit_transform(&[])
        .unwrap_err();
    assert!(matches!(err, DscvrError::Data(_)));
}

#[test]
fn corpus_without_shared_terms_is_data_error() {
    // min_df = 2 prunes every term when no two records share one.
    let corpus = vec![
        TrackRecord::new("Alpha", "One"),
        TrackRecord::new("Bravo", "Two"),
        TrackRecord::new("Charlie", "Three"),
    ];
    let err = FeatureBuilder::new(small_features())
        .fit_transform(&corpus)
        .unwrap_err();
    assert!(matches!(err, DscvrError::Data(_)));
}

#[test]
fn invalid_max_df_is_rejected() {
    let config = FeatureConfig {
        max_df: 1.5,
        ..small_features()
    };
    let err = FeatureBuilder::new(config)
        .fit_transform(&fixture_corpus())
        .unwrap_err();
    assert!(matches!(err, DscvrError::Data(_)));
}
