use crate::model::AnnotatedPoint;

/// AQUARIUS data-grade definitions, code → name.
///
/// | Code | Name          | Code | Name          |
/// |------|---------------|------|---------------|
/// | 0    | UNDEF         | 50   | EST EXCELLENT |
/// | 51   | EXCELLENT     | 40   | EST VERY GOOD |
/// | 41   | VERY GOOD     | 30   | EST GOOD      |
/// | 31   | GOOD          | 20   | EST FAIR      |
/// | 21   | FAIR          | 10   | EST POOR      |
/// | 11   | POOR          | 5    | EST NO        |
/// | 3    | ICE           | 1    | UNVERIFIED    |
/// | 2    | DRY           | -2   | UNUSABLE      |
/// | 4    | PARTIAL       | -1   | UNSP          |
/// |      |               | 6    | SUSPECT       |
pub static GRADE_DEFINITIONS: &[(i32, &str)] = &[
    (0, "UNDEF"),
    (51, "EXCELLENT"),
    (41, "VERY GOOD"),
    (31, "GOOD"),
    (21, "FAIR"),
    (11, "POOR"),
    (3, "ICE"),
    (2, "DRY"),
    (4, "PARTIAL"),
    (50, "EST EXCELLENT"),
    (40, "EST VERY GOOD"),
    (30, "EST GOOD"),
    (20, "EST FAIR"),
    (10, "EST POOR"),
    (5, "EST NO"),
    (1, "UNVERIFIED"),
    (-2, "UNUSABLE"),
    (-1, "UNSP"),
    (6, "SUSPECT"),
];

/// Looks up the grade name for a textual grade code.
pub fn grade_name(code: &str) -> Option<&'static str> {
    let code: i32 = code.trim().parse().ok()?;
    GRADE_DEFINITIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Resolves grade names by inner join on grade code.
///
/// Points carrying a code that has no definition are removed from the
/// result. Points never covered by a grade interval still have an empty code;
/// they pass through with an empty name.
pub fn join_grade_names(points: Vec<AnnotatedPoint>) -> Vec<AnnotatedPoint> {
    points
        .into_iter()
        .filter_map(|mut p| {
            if p.grade_code.is_empty() {
                return Some(p);
            }
            let name = grade_name(&p.grade_code)?;
            p.grade_name = name.to_string();
            Some(p)
        })
        .collect()
}
