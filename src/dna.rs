//! DNA fingerprint validation and codon-level similarity matching.
//!
//! Valid samples use the full four-base alphabet (`A`, `C`, `G`, `T`);
//! a charset check missing `'T'` would silently reject legitimate
//! samples, so all four bases are checked here.

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Shape check: non-empty, length divisible by 3, every character one of
/// A/C/G/T.
pub fn is_valid_dna(sample: &str) -> bool {
    !sample.is_empty() && sample.len() % 3 == 0 && sample.chars().all(|c| BASES.contains(&c))
}

fn split_codons(sample: &str) -> Vec<&str> {
    sample.as_bytes().chunks(3).map(|c| std::str::from_utf8(c).unwrap()).collect()
}

/// Classic Levenshtein distance (insert/delete/substitute, unit cost) over
/// whole codons rather than characters.
pub fn codon_edit_distance(a: &str, b: &str) -> usize {
    let ca = split_codons(a);
    let cb = split_codons(b);
    let (n, m) = (ca.len(), cb.len());

    let mut row: Vec<usize> = (0..=m).collect();
    for i in 1..=n {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=m {
            let temp = row[j];
            row[j] = if ca[i - 1] == cb[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j - 1]).min(row[j])
            };
            prev_diag = temp;
        }
    }
    row[m]
}

/// True iff `sample` matches reference `reference` within its codon-count
/// tolerance: `allowed = (reference codon count) / 100000`, floor division.
pub fn dna_matches(reference: &str, sample: &str) -> bool {
    let ref_codons = reference.len() / 3;
    let allowed = ref_codons / 100_000;

    if allowed == 0 && reference.len() != sample.len() {
        return false;
    }
    codon_edit_distance(reference, sample) <= allowed
}

/// True iff `sample` matches any of `references` (dna-login: iterate all
/// registered samples for the user, accept on first match).
pub fn dna_matches_any<'a>(references: impl IntoIterator<Item = &'a String>, sample: &str) -> bool {
    references.into_iter().any(|r| dna_matches(r, sample))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dna_requires_multiple_of_three_and_acgt() {
        assert!(is_valid_dna("ACG"));
        assert!(is_valid_dna("ACGTAC"));
        assert!(!is_valid_dna(""));
        assert!(!is_valid_dna("AC"));
        assert!(!is_valid_dna("ACX"));
    }

    #[test]
    fn exact_match_has_zero_distance() {
        assert_eq!(codon_edit_distance("ACGTAC", "ACGTAC"), 0);
        assert!(dna_matches("ACGTAC", "ACGTAC"));
    }

    #[test]
    fn single_codon_substitution_distance_one() {
        // "ACG TAC" vs "ACG TTT" -> one codon differs
        assert_eq!(codon_edit_distance("ACGTAC", "ACGTTT"), 1);
    }

    #[test]
    fn small_reference_requires_exact_length_match() {
        // allowed == 0 for references under 100_000 codons: any length
        // mismatch is an automatic non-match, even if codon-wise close.
        assert!(!dna_matches("ACGTAC", "ACG"));
    }

    #[test]
    fn large_reference_tolerates_bounded_edits() {
        // 300_000 codons => allowed = 3
        let reference: String = "ACG".repeat(300_000);
        let mut sample = reference.clone();
        // substitute 3 codons
        sample.replace_range(0..3, "TTT");
        sample.replace_range(9..12, "TTT");
        sample.replace_range(18..21, "TTT");
        assert!(dna_matches(&reference, &sample));
    }
}
