#![forbid(unsafe_code)]

use std::collections::HashSet;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// The category used when a topic matches nothing.
pub const DEFAULT_CATEGORY : &str = "random";

// ***************************************************************************
//                              Catalog Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// Category:
// ---------------------------------------------------------------------------
/** A named bucket of captions.  The weight is carried as metadata only; no
 * selection path reads it.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub captions: Vec<String>,
    #[allow(dead_code)]
    pub weight: f64,
}

impl Category {
    pub fn new(name: &str, captions: &[&str], weight: f64) -> Self {
        Self {
            name: name.to_string(),
            captions: captions.iter().map(|c| c.to_string()).collect(),
            weight,
        }
    }
}

// ---------------------------------------------------------------------------
// CategoryTable:
// ---------------------------------------------------------------------------
/** The immutable category catalog.  Categories keep their declaration order,
 * which decides the winner when a topic matches more than one category.
 * The table is built once at startup and shared read-only afterwards.
 */
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<Category>,
    default_name: String,
}

impl CategoryTable {
    /** Build a table after checking every catalog invariant:
     *
     *  - at least one category,
     *  - names are non-empty, lowercase and unique,
     *  - every category has at least one caption,
     *  - the default category is one of the categories.
     */
    pub fn new(categories: Vec<Category>, default_name: &str) -> Result<Self, Errors> {
        if categories.is_empty() {
            return Err(Errors::InvalidCatalog("no categories defined".to_string()));
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.name.is_empty() {
                return Err(Errors::InvalidCatalog("empty category name".to_string()));
            }
            if category.name != category.name.to_lowercase() {
                return Err(Errors::InvalidCatalog(
                    format!("category name '{}' is not lowercase", category.name)));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(Errors::InvalidCatalog(
                    format!("duplicate category name '{}'", category.name)));
            }
            if category.captions.is_empty() {
                return Err(Errors::InvalidCatalog(
                    format!("category '{}' has no captions", category.name)));
            }
        }

        if !seen.contains(default_name) {
            return Err(Errors::InvalidCatalog(
                format!("default category '{}' is not defined", default_name)));
        }

        Ok(Self {categories, default_name: default_name.to_string()})
    }

    /** The catalog shipped with the server. */
    pub fn builtin() -> Result<Self, Errors> {
        CategoryTable::new(builtin_categories(), DEFAULT_CATEGORY)
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Category names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }
}

// ***************************************************************************
//                             Builtin Captions
// ***************************************************************************
fn builtin_categories() -> Vec<Category> {
    vec![
        Category::new("coding", &[
            "When your code works on the first try: SUSPICIOUS",
            "Git commit -m 'Fixed bug' (changes: 1,234 files)",
            "Me: I'll document this later... 3 years later: What does this even do?",
            "Debugging: Removing code until the error disappears",
            "My code has no bugs, just undocumented features",
            "I don't always test my code, but when I do, I do it in production",
            "Compiling... (5 hours later) Still compiling...",
            "Me: I'll just code for 30 minutes... *sun rises*",
            "When you finally fix a bug but create two new ones",
            "My IDE knows more about my code than I do",
        ], 0.8),
        Category::new("exam", &[
            "When you recognize a question but can't remember the answer",
            "Me before exam: I'm prepared. Me during exam: What is this language?",
            "Multiple choice: When all options look equally wrong",
            "When you write an essay answer for a 1-mark question",
            "That moment when you realize you studied the wrong chapter",
            "When the exam is open book but you still fail",
            "Me: I'll just guess C. Exam: There is no C option",
            "When you finish the exam first but everyone else is still writing",
            "When the professor says 'easy exam' but it's actually a nightmare",
            "That one question worth 50% of the grade that you skipped",
        ], 0.7),
        Category::new("life", &[
            "Me as a kid: I'll never be like my parents. Me now: *becomes parents*",
            "When you're an adult but still wait for the 'real adults' to show up",
            "My motivation: Comes and goes like Wi-Fi signal",
            "Me: I should exercise. Also me: *orders pizza*",
            "When you wake up tired despite sleeping 12 hours",
            "My bank account: *cries in negative balance*",
            "Me: I'll be productive today. *watches Netflix for 8 hours*",
            "When you're hungry but too lazy to cook or order food",
            "Me trying to adult: *fails spectacularly*",
            "When you realize weekends are just days you don't get paid to be tired",
        ], 0.75),
        Category::new("relationships", &[
            "When your crush texts you: *overanalyzes for 3 hours*",
            "Me trying to flirt: *sounds like a malfunctioning robot*",
            "When you're single but your pet loves you unconditionally",
            "Relationship status: In a complicated relationship with food",
            "When you're arguing but forget what you're arguing about",
            "Me: I don't need love. Also me: *cries at romcoms*",
            "When they say 'we need to talk' and your soul leaves your body",
            "Dating in 2024: Swipe right for disappointment",
            "When you're the third wheel but the food is good",
            "Love language: Leaving me alone with snacks",
        ], 0.65),
        Category::new("random", &[
            "My spirit animal is a sloth on Ambien",
            "I'm not arguing, I'm just explaining why I'm right",
            "My hobbies include napping and forgetting things",
            "I'm not short, I'm concentrated awesome",
            "Error 404: Adulthood not found",
            "I don't hold grudges, I remember facts",
            "My social battery: *dies after 5 minutes*",
            "I'm not ignoring you, I'm prioritizing my peace",
            "My patience is thinner than my hairline",
            "I'm not lazy, I'm in energy-saving mode",
        ], 1.0),
    ]
}
