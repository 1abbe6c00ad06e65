use crate::{
    models::{
        Identity, NavigationItem, Notice, Role, ScreenView, ShellFooter, ShellHeader, ShellView,
        SidePanel,
    },
    navigation::Catalog,
};

/// LayoutShell
///
/// Persistent chrome of one mounted session: side panel, header and footer. It reflects
/// session and navigation state and owns nothing security-relevant; `is_collapsed` is
/// purely cosmetic and lives exactly as long as the shell.
#[derive(Debug, Clone, Default)]
pub struct LayoutShell {
    is_collapsed: bool,
    rendered_for: Option<Role>,
    entries: Vec<NavigationItem>,
}

impl LayoutShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    /// Flips the side panel and returns the new value.
    pub fn toggle_collapsed(&mut self) -> bool {
        self.is_collapsed = !self.is_collapsed;
        self.is_collapsed
    }

    pub fn entries(&self) -> &[NavigationItem] {
        &self.entries
    }

    /// sync
    ///
    /// Recomputes the side-panel entries when the role differs from the one they were
    /// built for. Returns whether a recomputation happened.
    pub fn sync(&mut self, catalog: &Catalog, role: Option<Role>) -> bool {
        if self.rendered_for == role {
            return false;
        }
        self.entries = match role {
            Some(role) => catalog.items_for(role),
            None => Vec::new(),
        };
        self.rendered_for = role;
        true
    }

    /// render
    ///
    /// Wraps a screen in the chrome for the given identity.
    pub fn render(
        &mut self,
        catalog: &Catalog,
        brand: &str,
        identity: &Identity,
        notices: Vec<Notice>,
        screen: ScreenView,
    ) -> ShellView {
        if self.sync(catalog, Some(identity.role)) {
            tracing::debug!(
                role = %identity.role,
                entries = self.entries.len(),
                "side panel rebuilt"
            );
        }
        ShellView {
            header: ShellHeader {
                brand: brand.to_string(),
                display_name: identity.display_name.clone(),
                role: identity.role,
                home: identity.role.landing_path().to_string(),
            },
            side_panel: SidePanel {
                collapsed: self.is_collapsed,
                entries: self.entries.clone(),
            },
            footer: ShellFooter {
                text: format!("{brand} v{}", env!("CARGO_PKG_VERSION")),
            },
            notices,
            screen,
        }
    }
}
