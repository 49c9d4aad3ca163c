//! Extraction of login forms, course links and gradeables from portal pages.
//!
//! The portal has no API; these functions read its rendered HTML. The class
//! names and labels below are the contract with the site and change when
//! the site does.

use duetrack_core::{CalendarTime, DueKind, Status, parse_due_text};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{PortalError, PortalResult};

/// Name of the user id input of the login form.
pub const USER_ID_FIELD: &str = "user_id";
/// Name of the password input of the login form.
pub const PASSWORD_FIELD: &str = "password";
/// Text the portal shows after rejecting a login.
pub const LOGIN_FAILURE_TEXT: &str = "Could not login using that user id or password";

const COURSE_BUTTON: &str = "a.btn.btn-primary.btn-block";
const GRADEABLE_ROW: &str = ".gradeable_row";
const GRADEABLE_BUTTON: &str = "a.btn, button.btn";
const SUBTITLE: &str = ".subtitle";

/// Button labels meaning nothing is left to submit.
pub const RESOLVED_MARKERS: [&str; 5] = [
    "VIEW GRADE",
    "NO SUBMISSION",
    "OVERDUE SUBMISSION",
    "REGRADE",
    "GRADE",
];

/// Button labels stripped from the end of a row's text to recover the
/// assignment name. Longer labels come first so that `LATE RESUBMIT` is
/// removed whole.
const BUTTON_LABELS: [&str; 10] = [
    "MUST BE ON A TEAM TO SUBMIT",
    "OVERDUE SUBMISSION",
    "LATE RESUBMIT",
    "NO SUBMISSION",
    "LATE SUBMIT",
    "VIEW GRADE",
    "RESUBMIT",
    "REGRADE",
    "SUBMIT",
    "GRADE",
];

/// The login form found on the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// The `action` attribute, if any.
    pub action: Option<String>,
    /// Hidden inputs (CSRF token and the like) to post back.
    pub hidden_fields: Vec<(String, String)>,
}

impl LoginForm {
    /// All fields to post, credentials last.
    pub fn fields(&self, user_id: &str, password: &str) -> Vec<(String, String)> {
        let mut fields = self.hidden_fields.clone();
        fields.push((USER_ID_FIELD.to_string(), user_id.to_string()));
        fields.push((PASSWORD_FIELD.to_string(), password.to_string()));
        fields
    }
}

/// A course button of the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseLink {
    /// Label without the semester prefix.
    pub name: String,
    pub href: String,
}

/// One gradeable row as rendered, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawGradeable {
    /// Whitespace-collapsed text of the whole row, text nodes separated by a
    /// space.
    pub text: String,
    /// Subtitle texts, in DOM order.
    pub subtitles: Vec<String>,
    /// Text of the first button, if any.
    pub button_text: Option<String>,
    pub button_href: Option<String>,
    /// Texts of every button of the row.
    pub button_texts: Vec<String>,
}

/// An open gradeable with its dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gradeable {
    pub name: String,
    pub due: CalendarTime,
    /// Team lock date of team assignments.
    pub teams_lock: Option<CalendarTime>,
    pub status: Status,
    pub link: Option<String>,
}

/// Interpretation of a [`RawGradeable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeableClass {
    /// Nothing left to do; `marker` is the label that said so.
    Resolved { name: String, marker: &'static str },
    Open(Gradeable),
}

fn selector(css: &'static str) -> PortalResult<Selector> {
    Selector::parse(css).map_err(|e| PortalError::markup(format!("bad selector `{css}`: {e}")))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Finds the form holding both credential inputs.
pub fn find_login_form(html: &str) -> PortalResult<LoginForm> {
    let document = Html::parse_document(html);
    let forms = selector("form")?;
    let user_id = selector("input[name=\"user_id\"]")?;
    let password = selector("input[name=\"password\"]")?;
    let hidden = selector("input[type=\"hidden\"]")?;

    let form = document
        .select(&forms)
        .find(|form| {
            form.select(&user_id).next().is_some() && form.select(&password).next().is_some()
        })
        .ok_or_else(|| PortalError::markup("no login form on the login page"))?;

    let hidden_fields = form
        .select(&hidden)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Ok(LoginForm {
        action: form
            .value()
            .attr("action")
            .filter(|action| !action.trim().is_empty())
            .map(str::to_string),
        hidden_fields,
    })
}

/// Returns true if the page carries the login rejection message.
pub fn is_login_rejected(html: &str) -> bool {
    html.contains(LOGIN_FAILURE_TEXT)
}

/// Course buttons whose label starts with `semester_prefix`, in page order.
pub fn find_course_links(html: &str, semester_prefix: &str) -> PortalResult<Vec<CourseLink>> {
    let document = Html::parse_document(html);
    let buttons = selector(COURSE_BUTTON)?;

    Ok(document
        .select(&buttons)
        .filter_map(|button| {
            let label = element_text(&button);
            let rest = label.strip_prefix(semester_prefix)?;
            let href = button.value().attr("href")?;
            let name = rest.trim();
            let name = if name.is_empty() { label.as_str() } else { name };
            Some(CourseLink {
                name: name.to_string(),
                href: href.to_string(),
            })
        })
        .collect())
}

/// Gradeable rows of a course page, in DOM order.
pub fn find_gradeables(html: &str) -> PortalResult<Vec<RawGradeable>> {
    let document = Html::parse_document(html);
    let rows = selector(GRADEABLE_ROW)?;
    let buttons = selector(GRADEABLE_BUTTON)?;
    let subtitles = selector(SUBTITLE)?;

    Ok(document
        .select(&rows)
        .map(|row| {
            let first_button = row.select(&buttons).next();
            RawGradeable {
                text: collapse_whitespace(&row.text().collect::<Vec<_>>().join(" ")),
                subtitles: row.select(&subtitles).map(|s| element_text(&s)).collect(),
                button_text: first_button.as_ref().map(element_text),
                button_href: first_button
                    .and_then(|b| b.value().attr("href"))
                    .map(str::to_string),
                button_texts: row.select(&buttons).map(|b| element_text(&b)).collect(),
            }
        })
        .collect())
}

/// Removes `label` from the end of `text` if it stands as whole words there.
fn strip_trailing_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let rest = text.strip_suffix(label)?;
    (rest.is_empty() || rest.ends_with(' ')).then_some(rest.trim_end())
}

/// Derives the assignment name from a row's text.
///
/// Subtitles are removed wherever they appear. Button texts are removed from
/// the end only, once each, so a name that contains a label keeps it. When no
/// button text ends the row, a single known label is stripped instead.
fn gradeable_name(raw: &RawGradeable) -> String {
    let mut text = raw.text.clone();
    for subtitle in &raw.subtitles {
        if !subtitle.is_empty() {
            text = text.replace(subtitle.as_str(), " ");
        }
    }
    let mut name = collapse_whitespace(&text);

    let mut stripped = false;
    for button in raw.button_texts.iter().rev().filter(|b| !b.is_empty()) {
        if let Some(rest) = strip_trailing_label(&name, button) {
            name = rest.to_string();
            stripped = true;
        }
    }
    if stripped {
        return name;
    }
    let rest = BUTTON_LABELS
        .into_iter()
        .find_map(|label| strip_trailing_label(&name, label))
        .map(str::to_string);
    rest.unwrap_or(name)
}

fn status_from_button(text: &str) -> Status {
    if text.to_ascii_uppercase().contains("TEAM") {
        Status::MustOnTeam
    } else {
        Status::from_label(text).unwrap_or_default()
    }
}

/// Decides whether a row is resolved and otherwise parses its dates.
///
/// # Errors
///
/// Fails when the row has no name or no parsable date. A row with only a
/// `(teams lock ...)` subtitle is due at its lock date.
pub fn classify_gradeable(raw: &RawGradeable) -> PortalResult<GradeableClass> {
    let name = gradeable_name(raw);
    if name.is_empty() {
        return Err(PortalError::markup(format!(
            "gradeable without a name: `{}`",
            raw.text
        )));
    }

    let button = raw.button_text.as_deref().unwrap_or_default();
    let buttons: Vec<String> = raw
        .button_texts
        .iter()
        .map(String::as_str)
        .chain(raw.button_text.as_deref())
        .map(str::to_ascii_uppercase)
        .collect();
    let resolved = RESOLVED_MARKERS
        .into_iter()
        .find(|marker| buttons.iter().any(|text| text.contains(marker)));
    if let Some(marker) = resolved {
        return Ok(GradeableClass::Resolved { name, marker });
    }

    let mut due = None;
    let mut teams_lock = None;
    for subtitle in &raw.subtitles {
        match parse_due_text(subtitle) {
            Ok((DueKind::Due, time)) if due.is_none() => due = Some(time),
            Ok((DueKind::TeamsLock, time)) if teams_lock.is_none() => teams_lock = Some(time),
            Ok(_) => {}
            Err(err) if DueKind::detect(subtitle.trim()).is_some() => {
                return Err(PortalError::markup(format!("{name}: {err}")));
            }
            Err(_) => {}
        }
    }
    let (due, teams_lock) = match (due, teams_lock) {
        (Some(due), lock) => (due, lock),
        (None, Some(lock)) => {
            debug!(%name, %lock, "No due date, using the teams lock date");
            (lock, None)
        }
        (None, None) => return Err(PortalError::markup(format!("{name}: no due date"))),
    };

    Ok(GradeableClass::Open(Gradeable {
        name,
        due,
        teams_lock,
        status: status_from_button(button),
        link: raw.button_href.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"
        <html><body>
          <form id="search" action="/search"><input name="q"></form>
          <form id="login-form" action="/authentication/check_login" method="post">
            <input type="hidden" name="csrf_token" value="tok123">
            <input type="hidden" name="redirect">
            <input type="text" name="user_id">
            <input type="password" name="password">
            <input type="submit" value="Login">
          </form>
        </body></html>"#;

    const HOME_PAGE: &str = r#"
        <html><body>
          <a class="btn btn-primary btn-block" href="/s19/csci1200">S19 Data Structures</a>
          <a class="btn btn-primary btn-block" href="/f18/csci1100">F18 Computer Science I</a>
          <a class="btn btn-primary btn-block" href="/s19/math2010">S19   Calculus II</a>
          <a class="btn btn-default" href="/s19/other">S19 Not a course button</a>
        </body></html>"#;

    const COURSE_PAGE: &str = r#"
        <html><body><table>
          <tr class="gradeable_row">
            <td>Homework 1 <span class="subtitle">(due 04/26/2019 @ 11:59 PM)</span></td>
            <td><a class="btn btn-primary" href="/s19/csci1200/gradeable/hw1">LATE SUBMIT</a></td>
          </tr>
          <tr class="gradeable_row">
            <td>Homework 0 <span class="subtitle">(due 01/20/2019 @ 11:59 PM)</span></td>
            <td><a class="btn btn-default" href="/s19/csci1200/gradeable/hw0/grade"
              >VIEW GRADE</a></td>
          </tr>
          <tr class="gradeable_row">
            <td>Team Project
              <span class="subtitle">(teams lock 04/01/2019 @ 12:00 PM)</span>
              <span class="subtitle">(due 05/01/2019 @ 09:00 AM)</span></td>
            <td><button class="btn btn-primary">MUST BE ON A TEAM TO SUBMIT</button></td>
          </tr>
          <tr class="gradeable_row">
            <td>Lab 5 <span class="subtitle">(due 13/01/2019 @ 09:00 AM)</span></td>
            <td><a class="btn btn-primary" href="/lab5">SUBMIT</a></td>
          </tr>
        </table></body></html>"#;

    fn ct(y: i32, m: u32, d: u32, h: u32, min: u32) -> CalendarTime {
        CalendarTime::new(y, m, d, h, min).unwrap()
    }

    mod login {
        use super::*;

        #[test]
        fn finds_form_with_credential_inputs() {
            let form = find_login_form(LOGIN_PAGE).unwrap();
            assert_eq!(form.action.as_deref(), Some("/authentication/check_login"));
            assert_eq!(
                form.hidden_fields,
                vec![
                    ("csrf_token".to_string(), "tok123".to_string()),
                    ("redirect".to_string(), String::new()),
                ]
            );
            let fields = form.fields("student", "secret");
            assert_eq!(fields.len(), 4);
            assert_eq!(fields[2], ("user_id".to_string(), "student".to_string()));
        }

        #[test]
        fn missing_form_is_markup_error() {
            assert!(matches!(
                find_login_form("<html><form><input name='q'></form></html>"),
                Err(PortalError::Markup(_))
            ));
        }

        #[test]
        fn detects_rejection() {
            let page = format!("<div class='alert'>{LOGIN_FAILURE_TEXT}</div>");
            assert!(is_login_rejected(&page));
            assert!(!is_login_rejected(HOME_PAGE));
        }
    }

    #[test]
    fn course_links_follow_prefix_in_page_order() {
        let links = find_course_links(HOME_PAGE, "S19").unwrap();
        assert_eq!(
            links,
            vec![
                CourseLink {
                    name: "Data Structures".into(),
                    href: "/s19/csci1200".into()
                },
                CourseLink {
                    name: "Calculus II".into(),
                    href: "/s19/math2010".into()
                },
            ]
        );
        assert!(find_course_links(HOME_PAGE, "F19").unwrap().is_empty());
    }

    mod gradeables {
        use super::*;

        fn rows() -> Vec<RawGradeable> {
            find_gradeables(COURSE_PAGE).unwrap()
        }

        #[test]
        fn rows_in_dom_order() {
            let rows = rows();
            assert_eq!(rows.len(), 4);
            assert_eq!(rows[0].subtitles, vec!["(due 04/26/2019 @ 11:59 PM)"]);
            assert_eq!(rows[0].button_text.as_deref(), Some("LATE SUBMIT"));
            assert_eq!(
                rows[0].button_href.as_deref(),
                Some("/s19/csci1200/gradeable/hw1")
            );
            assert_eq!(rows[2].button_href, None);
        }

        #[test]
        fn open_gradeable() {
            let class = classify_gradeable(&rows()[0]).unwrap();
            assert_eq!(
                class,
                GradeableClass::Open(Gradeable {
                    name: "Homework 1".into(),
                    due: ct(2019, 4, 26, 23, 59),
                    teams_lock: None,
                    status: Status::LateSubmit,
                    link: Some("/s19/csci1200/gradeable/hw1".into()),
                })
            );
        }

        #[test]
        fn resolved_marker_on_button() {
            assert_eq!(
                classify_gradeable(&rows()[1]).unwrap(),
                GradeableClass::Resolved {
                    name: "Homework 0".into(),
                    marker: "VIEW GRADE"
                }
            );
        }

        #[test]
        fn team_gradeable_has_lock_date() {
            match classify_gradeable(&rows()[2]).unwrap() {
                GradeableClass::Open(g) => {
                    assert_eq!(g.name, "Team Project");
                    assert_eq!(g.due, ct(2019, 5, 1, 9, 0));
                    assert_eq!(g.teams_lock, Some(ct(2019, 4, 1, 12, 0)));
                    assert_eq!(g.status, Status::MustOnTeam);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn bad_date_is_an_error() {
            let err = classify_gradeable(&rows()[3]).unwrap_err();
            assert!(err.to_string().contains("Lab 5"), "{err}");
        }

        #[test]
        fn missing_due_is_an_error() {
            let raw = RawGradeable {
                text: "Reading SUBMIT".into(),
                button_text: Some("SUBMIT".into()),
                button_texts: vec!["SUBMIT".into()],
                ..RawGradeable::default()
            };
            assert!(matches!(
                classify_gradeable(&raw),
                Err(PortalError::Markup(_))
            ));
        }

        #[test]
        fn resolved_marker_on_any_button() {
            let page = r#"
                <div class="gradeable_row">
                  <span>Homework 2</span><span class="subtitle">(due 04/26/2019 @ 11:59 PM)</span><a
                    class="btn btn-primary" href="/hw2">RESUBMIT</a><a
                    class="btn btn-default" href="/hw2/grade">VIEW GRADE</a>
                </div>"#;
            let rows = find_gradeables(page).unwrap();
            assert_eq!(
                classify_gradeable(&rows[0]).unwrap(),
                GradeableClass::Resolved {
                    name: "Homework 2".into(),
                    marker: "VIEW GRADE"
                }
            );
        }

        #[test]
        fn labels_inside_a_name_are_kept() {
            let page = r#"
                <div class="gradeable_row">
                  SUBMITTED REGRADE PLAN
                  <span class="subtitle">(due 05/02/2019 @ 05:00 PM)</span>
                  <a class="btn btn-primary" href="/plan">SUBMIT</a>
                </div>"#;
            let rows = find_gradeables(page).unwrap();
            match classify_gradeable(&rows[0]).unwrap() {
                GradeableClass::Open(g) => {
                    assert_eq!(g.name, "SUBMITTED REGRADE PLAN");
                    assert_eq!(g.due, ct(2019, 5, 2, 17, 0));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn trailing_button_texts_are_stripped_once() {
            let raw = RawGradeable {
                text: "Lab RESUBMIT (due 04/26/2019 @ 11:59 PM) LATE RESUBMIT VIEW GRADE".into(),
                subtitles: vec!["(due 04/26/2019 @ 11:59 PM)".into()],
                button_texts: vec!["LATE RESUBMIT".into(), "VIEW GRADE".into()],
                ..RawGradeable::default()
            };
            assert_eq!(gradeable_name(&raw), "Lab RESUBMIT");

            let unmatched = RawGradeable {
                text: "Quiz 3 (due 04/26/2019 @ 11:59 PM) LATE SUBMIT".into(),
                subtitles: vec!["(due 04/26/2019 @ 11:59 PM)".into()],
                ..RawGradeable::default()
            };
            assert_eq!(gradeable_name(&unmatched), "Quiz 3");
        }

        #[test]
        fn teams_lock_alone_is_the_due_date() {
            let raw = RawGradeable {
                text: "Team Setup (teams lock 04/01/2019 @ 12:00 PM) MUST BE ON A TEAM TO SUBMIT"
                    .into(),
                subtitles: vec!["(teams lock 04/01/2019 @ 12:00 PM)".into()],
                button_text: Some("MUST BE ON A TEAM TO SUBMIT".into()),
                button_texts: vec!["MUST BE ON A TEAM TO SUBMIT".into()],
                ..RawGradeable::default()
            };
            assert_eq!(
                classify_gradeable(&raw).unwrap(),
                GradeableClass::Open(Gradeable {
                    name: "Team Setup".into(),
                    due: ct(2019, 4, 1, 12, 0),
                    teams_lock: None,
                    status: Status::MustOnTeam,
                    link: None,
                })
            );
        }
    }
}
