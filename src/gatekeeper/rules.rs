//! Public Route Rules
//!
//! The allow-list consulted by the gatekeeper, expressed as an ordered table of
//! `pattern -> scope` rows evaluated top to bottom. Matching is raw string matching
//! on the request path: no trailing-slash collapsing and no case folding.

/// How a rule inspects the request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathPattern {
    /// The path ends with the literal.
    EndsWith(String),
    /// The literal occurs anywhere in the path.
    Contains(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::EndsWith(suffix) => path.ends_with(suffix.as_str()),
            PathPattern::Contains(needle) => path.contains(needle.as_str()),
        }
    }
}

/// Which realm a rule is allowed to open up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleScope {
    /// Applies to every path.
    Any,
    /// Applies only to paths outside the back-office (no admin marker).
    FrontOffice,
}

/// PublicRule
///
/// A single row of the allow-list. A matching row lets the request through
/// regardless of session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicRule {
    pub pattern: PathPattern,
    pub scope: RuleScope,
}

impl PublicRule {
    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Self {
            pattern: PathPattern::EndsWith(suffix.into()),
            scope: RuleScope::Any,
        }
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            pattern: PathPattern::Contains(needle.into()),
            scope: RuleScope::Any,
        }
    }

    /// Restricts the rule to front-office paths.
    pub fn front_office(mut self) -> Self {
        self.scope = RuleScope::FrontOffice;
        self
    }

    /// `back_office` is whether the path carries the admin marker.
    pub fn matches(&self, path: &str, back_office: bool) -> bool {
        if self.scope == RuleScope::FrontOffice && back_office {
            return false;
        }
        self.pattern.matches(path)
    }
}

/// default_public_rules
///
/// The stock allow-list for the mall: login/registration pages and actions, logout,
/// the username check, the error page, product images, the home page, the category
/// listing, product browsing and the database console.
///
/// Row 11, at index 10 (`contains("product")`), is deliberately broad: any
/// shopper-side path that mentions `product` is public, including cart actions
/// under `/mall/product/`. It is scoped to the front-office so back-office product
/// management stays gated.
pub fn default_public_rules() -> Vec<PublicRule> {
    vec![
        PublicRule::ends_with("toLogin.html"),
        PublicRule::ends_with("toRegister.html"),
        PublicRule::ends_with("register.do"),
        PublicRule::ends_with("login.do"),
        PublicRule::ends_with("logout.do"),
        PublicRule::ends_with("error.html"),
        PublicRule::ends_with("checkUsername.do"),
        PublicRule::contains("/mall/admin/product/img/"),
        PublicRule::ends_with("index.html"),
        PublicRule::ends_with("classification/list.do"),
        PublicRule::contains("product").front_office(),
        PublicRule::contains("/mall/h2-console"),
    ]
}

/// Returns the zero-based index of the first rule matching `path`, if any.
pub fn first_match(rules: &[PublicRule], path: &str, back_office: bool) -> Option<usize> {
    rules.iter().position(|rule| rule.matches(path, back_office))
}
