#![forbid(unsafe_code)]

use crate::utils::catalog::CategoryTable;
use crate::utils::shaping::trim_topic;

// ---------------------------------------------------------------------------
// resolve:
// ---------------------------------------------------------------------------
/** Map a free text topic to a category name in the table.  The topic is
 * lowercased and trimmed, then matched in this order with the first match
 * winning:
 *
 *  1. the topic equals a category name,
 *  2. walking the table in declaration order, a category name starts with
 *     or contains the topic,
 *  3. the table's default category.
 *
 * Resolution never fails, every input maps to a name present in the table.
 * Topic validation is the caller's job.
 */
pub fn resolve<'a>(topic: &str, table: &'a CategoryTable) -> &'a str {
    let topic = normalize(topic);

    // Exact match.
    if let Some(category) = table.get(&topic) {
        return &category.name;
    }

    // Prefix or substring match, declaration order decides ties.
    for category in table.iter() {
        if category.name.starts_with(&topic) || category.name.contains(&topic) {
            return &category.name;
        }
    }

    table.default_name()
}

// ---------------------------------------------------------------------------
// normalize:
// ---------------------------------------------------------------------------
fn normalize(topic: &str) -> String {
    trim_topic(&topic.to_lowercase()).to_string()
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::catalog::Category;

    fn builtin() -> CategoryTable {
        CategoryTable::builtin().unwrap()
    }

    #[test]
    fn exact_match_ignores_case_and_whitespace() {
        let table = builtin();
        for name in table.names() {
            assert_eq!(resolve(&name, &table), name);
            assert_eq!(resolve(&format!("  {}\t", name.to_uppercase()), &table), name);
        }
    }

    #[test]
    fn unique_prefix_match() {
        let table = builtin();
        assert_eq!(resolve("cod", &table), "coding");
        assert_eq!(resolve("ex", &table), "exam");
        assert_eq!(resolve("Relation", &table), "relationships");
        assert_eq!(resolve("li", &table), "life");
    }

    #[test]
    fn substring_match() {
        let table = builtin();
        assert_eq!(resolve("ship", &table), "relationships");
        assert_eq!(resolve("ndo", &table), "random");
    }

    #[test]
    fn declaration_order_breaks_ties() {
        // "e" is contained in exam, life, relationships; exam is declared first.
        let table = builtin();
        assert_eq!(resolve("e", &table), "exam");
        // "in" is contained in coding and relationships.
        assert_eq!(resolve("in", &table), "coding");
    }

    #[test]
    fn unmatched_topics_fall_back() {
        let table = builtin();
        assert_eq!(resolve("pizza", &table), "random");
        assert_eq!(resolve("coding is fun", &table), "random");
        assert_eq!(resolve("🦀", &table), "random");
    }

    #[test]
    fn separator_characters_are_trimmed() {
        let table = builtin();
        assert_eq!(resolve("\u{1c}Exam\u{1f}", &table), "exam");
    }

    #[test]
    fn resolve_is_idempotent() {
        let table = builtin();
        for topic in ["coding", "cod", "pizza", "E", "  LIFE "] {
            assert_eq!(resolve(topic, &table), resolve(topic, &table));
        }
    }

    #[test]
    fn substitute_table() {
        let cats = vec![
            Category::new("cats", &["meow"], 1.0),
            Category::new("dogs", &["woof"], 1.0),
            Category::new("misc", &["?"], 1.0),
        ];
        let table = CategoryTable::new(cats, "misc").unwrap();
        assert_eq!(resolve("DOG", &table), "dogs");
        assert_eq!(resolve("s", &table), "cats");
        assert_eq!(resolve("birds", &table), "misc");
    }
}
