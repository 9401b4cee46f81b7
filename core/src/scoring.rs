//! Simplified TF-IDF. No length normalization: fields are short and
//! structured, so raw term frequency already favors title/caption matches.

/// Score given to each satisfied range clause.
pub const RANGE_SCORE: f32 = 1.0;

/// `ln(1 + N / df)`. Zero when the term occurs nowhere.
pub fn idf(num_docs: u32, doc_freq: u32) -> f32 {
    if doc_freq == 0 {
        return 0.0;
    }
    (1.0 + num_docs as f32 / doc_freq as f32).ln()
}

/// Contribution of one matched term to a document's score.
pub fn term_score(tf: u32, num_docs: u32, doc_freq: u32) -> f32 {
    tf as f32 * idf(num_docs, doc_freq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_matches_smoothed_formula() {
        let expected = (1.0f32 + 10.0 / 2.0).ln();
        assert!((idf(10, 2) - expected).abs() < 1e-6);
        assert_eq!(idf(10, 0), 0.0);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        assert!(idf(100, 1) > idf(100, 50));
        assert!(idf(100, 100) > 0.0);
    }

    #[test]
    fn score_grows_with_tf() {
        assert!(term_score(3, 10, 2) > term_score(1, 10, 2));
    }
}
