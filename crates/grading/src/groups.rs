//! Student groups formed by mutual consent.
//!
//! Each student may name the partners they want to work with. A group is
//! formed only when every implied member named exactly the same co-members;
//! anything short of full agreement leaves the requester working alone. This
//! is consensus, not transitive closure: A→B plus B→C never yields {A, B, C}.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Diagnostic, DiagnosticCategory, GradingError, StudentLogin};

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// An unordered set of one or more students who submit and are graded together.
///
/// Members are kept sorted so equal groups compare, hash and serialise
/// identically. Serialises as a JSON array of logins.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<StudentLogin>", into = "Vec<StudentLogin>")]
pub struct Group(Vec<StudentLogin>);

impl Group {
    /// Creates a group from its members. Returns `None` if `members` is empty.
    pub fn new(members: impl IntoIterator<Item = StudentLogin>) -> Option<Self> {
        let members: BTreeSet<StudentLogin> = members.into_iter().collect();
        if members.is_empty() {
            None
        } else {
            Some(Self(members.into_iter().collect()))
        }
    }

    /// A group of one.
    pub fn solo(login: StudentLogin) -> Self {
        Self(vec![login])
    }

    /// Members in sorted order.
    pub fn members(&self) -> &[StudentLogin] {
        &self.0
    }

    /// Returns `true` if `login` belongs to this group.
    pub fn contains(&self, login: &StudentLogin) -> bool {
        self.0.binary_search(login).is_ok()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; groups have at least one member.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical storage key: sorted logins joined with `_`.
    pub fn canonical(&self) -> String {
        self.0.iter().map(StudentLogin::as_str).collect::<Vec<_>>().join("_")
    }

    /// Display form: sorted logins joined with `, `.
    pub fn pretty(&self) -> String {
        self.0.iter().map(StudentLogin::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl TryFrom<Vec<StudentLogin>> for Group {
    type Error = String;

    fn try_from(members: Vec<StudentLogin>) -> Result<Self, Self::Error> {
        Self::new(members).ok_or_else(|| "a group needs at least one member".to_string())
    }
}

impl From<Group> for Vec<StudentLogin> {
    fn from(group: Group) -> Self {
        group.0
    }
}

/// Sorts groups by their canonical string so downstream file layout is
/// reproducible.
pub fn sort_groups(groups: &mut [Group]) {
    groups.sort_by_cached_key(Group::canonical);
}

// ---------------------------------------------------------------------------
// Partner requests
// ---------------------------------------------------------------------------

/// Splits raw partner-request text (a comma-separated login list) into names.
pub fn split_request(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of [`GroupResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupResolution {
    /// Groups in canonical order; together they partition the roster.
    pub groups: Vec<Group>,
    /// Findings about ignored or unreciprocated requests.
    pub diagnostics: Vec<Diagnostic>,
}

/// Reconciles partner requests into a partition of the roster.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupResolver {
    max_group_size: Option<usize>,
}

impl GroupResolver {
    /// A resolver with no group size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores requests whose implied group (requester included) is larger
    /// than `max`.
    pub fn with_max_group_size(mut self, max: usize) -> Self {
        self.max_group_size = Some(max);
        self
    }

    /// Forms groups for `roster` from each student's raw request text.
    ///
    /// Names are matched against the roster case-insensitively; unknown names
    /// and self-references are dropped with a diagnostic. Requests keyed by a
    /// login that is not on the roster are ignored.
    pub fn resolve(
        &self,
        roster: &[StudentLogin],
        requests: &IndexMap<StudentLogin, String>,
    ) -> Result<GroupResolution, GradingError> {
        let roster = dedup_roster(roster);
        let mut diagnostics = Vec::new();
        let partners = self.recognise_requests(&roster, requests, &mut diagnostics);

        let mut placed: HashSet<&StudentLogin> = HashSet::with_capacity(roster.len());
        let mut groups = Vec::new();

        for login in &roster {
            if placed.contains(login) {
                continue;
            }
            let Some(requested) = partners.get(login) else {
                placed.insert(login);
                groups.push(Group::solo(login.clone()));
                continue;
            };

            let mut implied = requested.clone();
            implied.insert(login.clone());

            match check_consensus(login, &implied, &partners) {
                Ok(()) => {
                    for member in &implied {
                        if let Some(original) = roster.iter().find(|r| *r == member) {
                            placed.insert(original);
                        }
                    }
                    if let Some(group) = Group::new(implied) {
                        debug!(group = %group, "formed group");
                        groups.push(group);
                    }
                }
                Err(diagnostic) => {
                    warn!(student = %login, "{}", diagnostic.message);
                    diagnostics.push(diagnostic);
                    placed.insert(login);
                    groups.push(Group::solo(login.clone()));
                }
            }
        }

        sort_groups(&mut groups);
        verify_partition(&roster, &groups)?;
        Ok(GroupResolution { groups, diagnostics })
    }

    /// Maps each requesting roster member to the recognised logins they named.
    fn recognise_requests(
        &self,
        roster: &[StudentLogin],
        requests: &IndexMap<StudentLogin, String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> IndexMap<StudentLogin, BTreeSet<StudentLogin>> {
        let lookup = |name: &str| roster.iter().find(|login| login.matches_ignore_case(name));
        let mut partners = IndexMap::new();

        for (requester, raw) in requests {
            let Some(requester) = lookup(requester.as_str()) else {
                debug!(requester = %requester, "ignoring request from a login not on the roster");
                continue;
            };

            let mut named = BTreeSet::new();
            for name in split_request(raw) {
                match lookup(&name) {
                    Some(partner) if partner == requester => {
                        debug!(student = %requester, "dropping self-reference from partner request");
                        diagnostics.push(Diagnostic::informational(
                            DiagnosticCategory::SelfRequest,
                            format!("{requester} listed themself as a partner"),
                        ));
                    }
                    Some(partner) => {
                        named.insert(partner.clone());
                    }
                    None => {
                        warn!(student = %requester, partner = %name, "requested partner is not on the roster");
                        diagnostics.push(Diagnostic::warning(
                            DiagnosticCategory::UnknownStudent,
                            format!("{requester} requested {name}, who is not on the roster"),
                        ));
                    }
                }
            }
            if named.is_empty() {
                continue;
            }

            if let Some(max) = self.max_group_size {
                if named.len() + 1 > max {
                    let message = format!(
                        "{requester} requested a group of {} but the maximum group size is {max}; ignoring",
                        named.len() + 1
                    );
                    warn!(student = %requester, "{message}");
                    diagnostics.push(Diagnostic::warning(DiagnosticCategory::GroupTooLarge, message));
                    continue;
                }
            }

            partners.insert(requester.clone(), named);
        }
        partners
    }
}

fn dedup_roster(roster: &[StudentLogin]) -> Vec<StudentLogin> {
    let mut seen = HashSet::with_capacity(roster.len());
    roster
        .iter()
        .filter(|login| seen.insert(login.as_str().to_lowercase()))
        .cloned()
        .collect()
}

/// Succeeds only if every implied co-member made a request naming exactly the
/// same group.
fn check_consensus(
    requester: &StudentLogin,
    implied: &BTreeSet<StudentLogin>,
    partners: &IndexMap<StudentLogin, BTreeSet<StudentLogin>>,
) -> Result<(), Diagnostic> {
    for partner in implied.iter().filter(|member| *member != requester) {
        let Some(theirs) = partners.get(partner) else {
            return Err(Diagnostic::warning(
                DiagnosticCategory::Unreciprocated,
                format!("{requester} requested partners but the partner {partner} did not request them back"),
            ));
        };
        let mut their_group = theirs.clone();
        their_group.insert(partner.clone());
        if &their_group != implied {
            return Err(Diagnostic::warning(
                DiagnosticCategory::Unreciprocated,
                format!("{requester} requested partners but {partner} named a different group"),
            ));
        }
    }
    Ok(())
}

/// Checks that `groups` cover `roster` exactly once.
///
/// A failure here is an internal invariant violation, never a user error.
pub fn verify_partition(roster: &[StudentLogin], groups: &[Group]) -> Result<(), GradingError> {
    let expected: HashSet<&StudentLogin> = roster.iter().collect();
    let mut seen: HashSet<&StudentLogin> = HashSet::with_capacity(roster.len());
    let mut problems = Vec::new();

    for member in groups.iter().flat_map(Group::members) {
        if !seen.insert(member) {
            problems.push(format!("{member} appears in more than one group"));
        }
        if !expected.contains(member) {
            problems.push(format!("{member} is not on the roster"));
        }
    }
    for login in roster {
        if !seen.contains(login) {
            problems.push(format!("{login} is in no group"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(GradingError::GroupInvariantViolation {
            details: problems.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiagnosticSeverity;

    fn login(s: &str) -> StudentLogin {
        StudentLogin::new(s).unwrap()
    }

    fn roster(names: &[&str]) -> Vec<StudentLogin> {
        names.iter().map(|n| login(n)).collect()
    }

    fn requests(pairs: &[(&str, &str)]) -> IndexMap<StudentLogin, String> {
        pairs.iter().map(|(k, v)| (login(k), v.to_string())).collect()
    }

    fn canonical(resolution: &GroupResolution) -> Vec<String> {
        resolution.groups.iter().map(Group::canonical).collect()
    }

    #[test]
    fn test_group_is_sorted_and_canonical() {
        let group = Group::new([login("zoe"), login("adam"), login("zoe")]).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.canonical(), "adam_zoe");
        assert_eq!(group.pretty(), "adam, zoe");
        assert!(group.contains(&login("zoe")));
        assert!(Group::new(Vec::new()).is_none());
    }

    #[test]
    fn test_group_serialises_as_array() {
        let group = Group::new([login("b"), login("a")]).unwrap();
        assert_eq!(serde_json::to_string(&group).unwrap(), r#"["a","b"]"#);
        let back: Group = serde_json::from_str(r#"["b","a"]"#).unwrap();
        assert_eq!(back, group);
        assert!(serde_json::from_str::<Group>("[]").is_err());
    }

    #[test]
    fn test_split_request() {
        assert_eq!(split_request(" alice, bob ,,"), vec!["alice", "bob"]);
        assert!(split_request("  ").is_empty());
    }

    #[test]
    fn test_mutual_pair() {
        let result = GroupResolver::new()
            .resolve(&roster(&["A", "B"]), &requests(&[("A", "B"), ("B", "A")]))
            .unwrap();
        assert_eq!(canonical(&result), vec!["A_B"]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_case_insensitive_matching_keeps_roster_case() {
        let result = GroupResolver::new()
            .resolve(&roster(&["Alice", "bob"]), &requests(&[("Alice", "BOB"), ("bob", "alice")]))
            .unwrap();
        assert_eq!(canonical(&result), vec!["Alice_bob"]);
    }

    #[test]
    fn test_unreciprocated_request_is_solo() {
        let result = GroupResolver::new()
            .resolve(&roster(&["A", "B", "C"]), &requests(&[("A", "B")]))
            .unwrap();
        assert_eq!(canonical(&result), vec!["A", "B", "C"]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, DiagnosticCategory::Unreciprocated);
    }

    #[test]
    fn test_disagreeing_trio_is_never_partial() {
        let result = GroupResolver::new()
            .resolve(
                &roster(&["A", "B", "C"]),
                &requests(&[("A", "B, C"), ("B", "A, C"), ("C", "A")]),
            )
            .unwrap();
        assert_eq!(canonical(&result), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_full_trio() {
        let result = GroupResolver::new()
            .resolve(
                &roster(&["C", "A", "B", "D"]),
                &requests(&[("A", "B, C"), ("B", "A,C"), ("C", "b, a")]),
            )
            .unwrap();
        assert_eq!(canonical(&result), vec!["A_B_C", "D"]);
    }

    #[test]
    fn test_group_size_limit() {
        let result = GroupResolver::new()
            .with_max_group_size(2)
            .resolve(
                &roster(&["A", "B", "C"]),
                &requests(&[("A", "B, C"), ("B", "A, C"), ("C", "A, B")]),
            )
            .unwrap();
        assert_eq!(canonical(&result), vec!["A", "B", "C"]);
        assert_eq!(
            result
                .diagnostics
                .iter()
                .filter(|d| d.category == DiagnosticCategory::GroupTooLarge)
                .count(),
            3
        );
    }

    #[test]
    fn test_unknown_and_self_names_ignored() {
        let result = GroupResolver::new()
            .resolve(
                &roster(&["A", "B"]),
                &requests(&[("A", "A, ghost, B"), ("B", "A")]),
            )
            .unwrap();
        assert_eq!(canonical(&result), vec!["A_B"]);
        let categories: Vec<_> = result.diagnostics.iter().map(|d| d.category).collect();
        assert!(categories.contains(&DiagnosticCategory::SelfRequest));
        assert!(categories.contains(&DiagnosticCategory::UnknownStudent));
        for diagnostic in &result.diagnostics {
            let expected = match diagnostic.category {
                DiagnosticCategory::SelfRequest => DiagnosticSeverity::Informational,
                _ => DiagnosticSeverity::Warning,
            };
            assert_eq!(diagnostic.severity, expected, "{diagnostic}");
        }
    }

    #[test]
    fn test_verify_partition_reports_problems() {
        let roster = roster(&["A", "B"]);
        let groups = vec![Group::solo(login("A")), Group::new([login("A"), login("C")]).unwrap()];
        let err = verify_partition(&roster, &groups).unwrap_err();
        assert!(err.is_internal());
        let message = err.to_string();
        assert!(message.contains("A appears in more than one group"));
        assert!(message.contains("C is not on the roster"));
        assert!(message.contains("B is in no group"));
    }
}
