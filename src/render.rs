//! ASCII tree rendering for applications grouped by status.

use crate::models::Application;
use crate::store::ApplicationsByStatus;

/// Render grouped applications as one tree per status.
///
/// Example output:
/// ```text
/// Applied (2)
/// ├── Backend Engineer @ Acme
/// └── SRE @ Globex
/// Wishlist (1)
/// └── Rust Developer @ Initech
/// ```
pub fn render_by_status(groups: &ApplicationsByStatus) -> String {
    let mut output = String::new();
    for (status, applications) in groups {
        output.push_str(&format!("{} ({})\n", status, applications.len()));
        render_group(&mut output, applications);
    }
    output
}

fn render_group(output: &mut String, applications: &[Application]) {
    for (i, app) in applications.iter().enumerate() {
        let is_last = i == applications.len() - 1;
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(branch);
        output.push_str(&app.label());
        output.push('\n');
    }
}
