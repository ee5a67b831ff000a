//! The Ghost admin members UI: selector contract and workflow builders

use crate::fixture::{MemberEdit, MemberRecord};
use crate::workflow::{Locator, Workflow};

/// Selectors the admin and portal UIs must keep stable
pub mod selectors {
    pub const NAV_MEMBERS: &str = r##".gh-nav a[href="#/members/"]"##;
    pub const NEW_MEMBER_LINK: &str = r##"a[href="#/members/new/"] span"##;
    pub const NEW_MEMBER: &str = r##"a[href="#/members/new/"] span:has-text("New member")"##;

    pub const NAME_INPUT: &str = r#"input[name="name"]"#;
    pub const EMAIL_INPUT: &str = r#"input[name="email"]"#;
    pub const NOTE_INPUT: &str = r#"textarea[name="note"]"#;
    pub const LABELS_PICKER: &str = r#"label:has-text("Labels") + div"#;
    pub const SUBSCRIBED_TOGGLE: &str = r#"input[name="subscribed"] + span"#;
    pub const BODY: &str = "body";
    pub const SAVE: &str = r#"button span:has-text("Save")"#;
    pub const SAVED: &str = r#"button span:has-text("Saved")"#;

    pub const ROWS: &str = "tbody > tr";
    pub const ROW_LINK: &str = "tbody > tr > a";
    pub const ROW_NAME: &str = "tbody > tr > a > div > div > h3";
    pub const ROW_EMAIL: &str = "tbody > tr > a > div > div > p";
    pub const EMPTY_STATE: &str = r#"div h4:has-text("Start building your audience")"#;

    pub const MEMBER_ACTIONS: &str = r#"[data-test-button="member-actions"]"#;
    pub const IMPERSONATE: &str = "Impersonate";
    pub const DELETE_MEMBER: &str = "Delete member";
    pub const COPY_LINK: &str = "Copy link";
    pub const LINK_COPIED: &str = r#"button span:has-text("Link copied")"#;
    pub const SIGNIN_URL_INPUT: &str = r#"input[name="member-signin-url"]"#;
    pub const CONFIRM_DELETE: &str =
        r#"button[data-test-button="confirm"] span:has-text("Delete member")"#;

    pub const LIST_ACTIONS: &str = r#"button[data-test-button="members-actions"]"#;
    pub const EXPORT: &str = r#"button[data-test-button="export-members"]"#;
    pub const EXPORT_LABEL: &str = r#"button[data-test-button="export-members"] > span"#;
    pub const FILTER_ACTIONS: &str = r#"div[data-test-button="members-filter-actions"]"#;
    pub const FILTER_SELECT: &str = r#"select[data-test-select="members-filter"]"#;
    pub const APPLY_FILTER: &str = r#"button[data-test-button="members-apply-filter"]"#;

    pub const PORTAL_TRIGGER_FRAME: &str = r#"#ghost-portal-root iframe[title="portal-trigger"]"#;
    pub const PORTAL_POPUP_FRAME: &str = r#"#ghost-portal-root div iframe[title="portal-popup"]"#;
    pub const PORTAL_HEADING: &str = "h2";

    pub const SIGNIN_IDENTIFICATION: &str = r#"input[name="identification"]"#;
    pub const SIGNIN_PASSWORD: &str = r#"input[name="password"]"#;
    pub const SIGNIN_SUBMIT: &str = r#"button[data-test-button="sign-in"]"#;
    pub const ADMIN_NAV: &str = ".gh-nav";
}

/// Heading the portal popup shows to a signed-in member
pub const PORTAL_SIGNED_IN_HEADING: &str = "Your account";

/// Route of the admin application, relative to the site URL
pub const ADMIN_PATH: &str = "/ghost";

/// Staff credentials for the admin sign-in form
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn css(selector: &str) -> Locator {
    Locator::css(selector)
}

/// Sign in to the admin and wait for the navigation to render
pub fn sign_in(credentials: &Credentials) -> Workflow {
    Workflow::new("sign-in")
        .navigate(ADMIN_PATH)
        .fill(css(selectors::SIGNIN_IDENTIFICATION), credentials.email.as_str())
        .fill(css(selectors::SIGNIN_PASSWORD), credentials.password.as_str())
        .click(css(selectors::SIGNIN_SUBMIT))
        .wait_for(css(selectors::ADMIN_NAV))
}

/// Load the admin root, the starting point of every scenario
pub fn open_admin() -> Workflow {
    Workflow::new("open-admin").navigate(ADMIN_PATH)
}

/// Open the members list from the admin navigation
pub fn open_members_list() -> Workflow {
    Workflow::new("open-members-list").click(css(selectors::NAV_MEMBERS))
}

/// Open the detail page of the n-th member in the list
pub fn open_member(index: usize) -> Workflow {
    open_members_list()
        .click(css(selectors::ROW_LINK).nth(index))
        .wait_for(css(selectors::NAME_INPUT))
}

/// Create a member from a fixture record, starting from any admin page
pub fn create_member(record: &MemberRecord) -> Workflow {
    let mut workflow = open_members_list()
        .wait_for(css(selectors::NEW_MEMBER_LINK))
        .click(css(selectors::NEW_MEMBER))
        .wait_for(css(selectors::NAME_INPUT))
        .fill(css(selectors::NAME_INPUT), record.name.as_str())
        .fill(css(selectors::EMAIL_INPUT), record.email.as_str())
        .fill(css(selectors::NOTE_INPUT), record.note.as_str())
        .click(css(selectors::LABELS_PICKER))
        .type_text(record.label.as_str())
        .press_key("Tab")
        .click(css(selectors::SAVE))
        .wait_for(css(selectors::SAVED));
    workflow.name = format!("create-member:{}", record.email);
    workflow
}

/// Overwrite the first member's details
pub fn edit_member(edit: &MemberEdit) -> Workflow {
    let mut workflow = open_member(0)
        .fill(css(selectors::NAME_INPUT), edit.name.as_str())
        .fill(css(selectors::EMAIL_INPUT), edit.email.as_str())
        .fill(css(selectors::NOTE_INPUT), edit.note.as_str());

    if edit.clear_label {
        // Clicking the body closes the label dropdown
        workflow = workflow
            .click(css(selectors::LABELS_PICKER))
            .press_key("Backspace")
            .click(css(selectors::BODY));
    }
    if edit.toggle_subscription {
        workflow = workflow.click(css(selectors::SUBSCRIBED_TOGGLE));
    }

    let mut workflow = workflow
        .click(css(selectors::SAVE))
        .wait_for(css(selectors::SAVED));
    workflow.name = format!("edit-member:{}", edit.email);
    workflow
}

/// Open the first member's action menu
fn open_member_actions() -> Workflow {
    open_member(0)
        .wait_for(css(selectors::MEMBER_ACTIONS))
        .click(css(selectors::MEMBER_ACTIONS))
}

/// Reveal the first member's impersonation link in the sign-in URL input
pub fn reveal_impersonation_link() -> Workflow {
    let mut workflow = open_member_actions()
        .click(Locator::role_button(selectors::IMPERSONATE))
        .click(Locator::role_button(selectors::COPY_LINK))
        .wait_for(css(selectors::LINK_COPIED));
    workflow.name = "reveal-impersonation-link".to_string();
    workflow
}

/// Follow an impersonation link and open the portal popup
pub fn open_portal_as_member(link: &str) -> Workflow {
    Workflow::new("open-portal")
        .navigate(link)
        .click(css("div").nth(1).in_frame(selectors::PORTAL_TRIGGER_FRAME))
        .wait_for(css(selectors::PORTAL_HEADING).in_frame(selectors::PORTAL_POPUP_FRAME))
}

/// Delete the first member and confirm
pub fn delete_member() -> Workflow {
    let mut workflow = open_member_actions()
        .click(Locator::role_button(selectors::DELETE_MEMBER))
        .click(css(selectors::CONFIRM_DELETE));
    workflow.name = "delete-member".to_string();
    workflow
}

/// Open the members list action menu
pub fn open_list_actions() -> Workflow {
    open_members_list()
        .wait_for(css(selectors::LIST_ACTIONS))
        .click(css(selectors::LIST_ACTIONS))
}

/// Apply a members filter through the list action menu
pub fn apply_filter(filter: &str) -> Workflow {
    let mut workflow = open_list_actions()
        .wait_for(css(selectors::FILTER_ACTIONS))
        .click(css(selectors::FILTER_ACTIONS))
        .click(css(selectors::FILTER_SELECT))
        .select_option(css(selectors::FILTER_SELECT), filter)
        .click(css(selectors::APPLY_FILTER))
        .click(css(selectors::LIST_ACTIONS));
    workflow.name = format!("apply-filter:{}", filter);
    workflow
}

/// Trigger the export from an open list action menu and wait for the file
pub fn export_members() -> Workflow {
    Workflow::new("export-members")
        .wait_for(css(selectors::EXPORT))
        .click(css(selectors::EXPORT))
        .wait_for_download()
}
