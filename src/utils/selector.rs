#![forbid(unsafe_code)]

use rand::seq::SliceRandom;
use rand::Rng;

use crate::utils::catalog::CategoryTable;
use crate::utils::errors::Errors;

// ---------------------------------------------------------------------------
// select:
// ---------------------------------------------------------------------------
/** Draw one caption uniformly at random from the named category.  The random
 * source is supplied by the caller so that tests can make the draw
 * deterministic.  Every call is independent; no caption is ever excluded
 * because it was returned before.
 *
 * The category must come from the resolver, so an unknown name indicates a
 * programming error and is reported as InternalInconsistency.
 */
pub fn select<'a, R>(category_name: &str, table: &'a CategoryTable, rng: &mut R) -> Result<&'a str, Errors>
where
    R: Rng + ?Sized,
{
    let category = match table.get(category_name) {
        Some(c) => c,
        None => return Err(Errors::InternalInconsistency(category_name.to_string())),
    };

    match category.captions.choose(rng) {
        Some(caption) => Ok(caption.as_str()),
        None => Err(Errors::InternalInconsistency(category_name.to_string())),
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    use crate::utils::catalog::Category;

    #[test]
    fn deterministic_source_gives_exact_caption() {
        let cats = vec![Category::new("random", &["first", "second", "third"], 1.0)];
        let table = CategoryTable::new(cats, "random").unwrap();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(select("random", &table, &mut rng).unwrap(), "first");
    }

    #[test]
    fn covers_every_caption() {
        let table = CategoryTable::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let coding = table.get("coding").unwrap();

        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let caption = select("coding", &table, &mut rng).unwrap();
            assert!(coding.captions.iter().any(|c| c == caption));
            seen.insert(caption.to_string());
        }
        assert_eq!(seen.len(), coding.captions.len());
    }

    #[test]
    fn single_caption_category() {
        let cats = vec![Category::new("random", &["only"], 1.0)];
        let table = CategoryTable::new(cats, "random").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(select("random", &table, &mut rng).unwrap(), "only");
        }
    }

    #[test]
    fn unknown_category_is_inconsistent() {
        let table = CategoryTable::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(select("memes", &table, &mut rng), Err(Errors::InternalInconsistency(_))));
    }
}
