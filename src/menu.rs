//! Static menu catalog and the single open panel.
//!
//! Picking an item turns into a canned question whose wording the worker
//! matches on, so the templates below must not change.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuCategory {
    Policies,
    Protocols,
    Handbook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub id: &'static str,
    pub label: &'static str,
}

const fn item(id: &'static str, label: &'static str) -> MenuItem {
    MenuItem { id, label }
}

const POLICIES: &[MenuItem] = &[
    item("safe-arrival-dismissal", "Safe Arrival & Dismissal"),
    item("playground-safety", "Playground Safety"),
    item("anaphylaxis", "Anaphylaxis Policy"),
    item("medication-administration", "Medication Administration"),
    item("emergency-management", "Emergency Management"),
    item("sleep-toddler-preschool", "Sleep – Toddler & Preschool"),
    item("sleep-infants", "Sleep – Infants"),
    item("supervision-students-volunteers", "Supervision of Students & Volunteers"),
    item("waiting-list", "Waiting List"),
    item("program-statement-implementation", "Program Statement Implementation"),
    item("staff-development-training", "Staff Development & Training"),
    item("parent-issues-concerns", "Parent Issues & Concerns"),
    item("behaviour-management-monitoring", "Behaviour Management Monitoring"),
    item("fire-safety-evacuation", "Fire Safety Evacuation"),
    item("criminal-reference-vsc", "Criminal Reference / VSC"),
];

const PROTOCOLS: &[MenuItem] = &[
    item("program-statement", "CMS Program Statement and Implementation"),
    item("non-discrimination", "Non-Discrimination / Anti-Racism Policy"),
    item("safety-security", "Safety & Security"),
    item("new-school-year", "Start of the New School Year"),
    item("employee-conduct", "Employee Protocol / Conduct"),
    item("classroom-management", "Classroom Management & Routines"),
    item("caring-for-students", "Caring for Our Students"),
    item("afterschool-routines", "Afterschool Routines & Extracurricular Activities"),
    item("special-events", "Special Events"),
    item("reports-forms", "Reports & Forms"),
    item("other", "Other"),
    item("in-closing", "In closing"),
];

const HANDBOOK: &[MenuItem] = &[item("parent-handbook", "Open my campus Parent Handbook")];

impl MenuCategory {
    pub const ALL: [MenuCategory; 3] = [Self::Policies, Self::Protocols, Self::Handbook];

    pub fn items(self) -> &'static [MenuItem] {
        match self {
            Self::Policies => POLICIES,
            Self::Protocols => PROTOCOLS,
            Self::Handbook => HANDBOOK,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Policies => "Policies",
            Self::Protocols => "Protocols",
            Self::Handbook => "Parent Handbook",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Policies => "policies",
            Self::Protocols => "protocols",
            Self::Handbook => "handbook",
        }
    }

    pub fn find(self, id: &str) -> Option<&'static MenuItem> {
        self.items().iter().find(|item| item.id == id)
    }

    /// Handbook items need a campus; every other item is always available.
    pub fn requires_campus(self) -> bool {
        self == Self::Handbook
    }

    /// Build the canned question for `item`. Returns `None` for a handbook
    /// pick without a campus, which the UI must treat as disabled.
    pub fn canned_question(self, item: &MenuItem, campus: Option<&str>) -> Option<String> {
        match self {
            Self::Policies => Some(format!("Please show me the policy: {}", item.label)),
            Self::Protocols => Some(format!("Please show me the protocol: {}", item.label)),
            Self::Handbook => campus
                .filter(|c| !c.trim().is_empty())
                .map(|c| format!("Please show my campus Parent Handbook ({c}).")),
        }
    }
}

impl fmt::Display for MenuCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MenuCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "policies" | "policy" => Ok(Self::Policies),
            "protocols" | "protocol" => Ok(Self::Protocols),
            "handbook" | "parent-handbook" => Ok(Self::Handbook),
            other => Err(format!(
                "Unknown menu '{}'. Choose one of: policies, protocols, handbook",
                other
            )),
        }
    }
}

/// At most one category panel is open at a time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MenuPanel {
    open: Option<MenuCategory>,
}

impl MenuPanel {
    pub fn open_category(&self) -> Option<MenuCategory> {
        self.open
    }

    /// Toggle: the open category closes, any other one replaces it.
    pub fn toggle(&mut self, category: MenuCategory) -> Option<&'static [MenuItem]> {
        if self.open == Some(category) {
            self.open = None;
            None
        } else {
            self.open = Some(category);
            Some(category.items())
        }
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn is_enabled(category: MenuCategory, campus: Option<&str>) -> bool {
        !category.requires_campus() || campus.is_some_and(|c| !c.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_size() {
        assert_eq!(MenuCategory::Policies.items().len(), 15);
        assert_eq!(MenuCategory::Protocols.items().len(), 12);
        assert_eq!(MenuCategory::Handbook.items().len(), 1);
        assert_eq!(MenuCategory::Policies.items()[0].label, "Safe Arrival & Dismissal");
        assert_eq!(MenuCategory::Protocols.items()[11].label, "In closing");
    }

    #[test]
    fn test_item_ids_are_unique() {
        for category in MenuCategory::ALL {
            let mut ids: Vec<_> = category.items().iter().map(|i| i.id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), category.items().len(), "{category}");
        }
    }

    #[test]
    fn test_canned_questions() {
        let waiting = MenuCategory::Policies.find("waiting-list").unwrap();
        assert_eq!(
            MenuCategory::Policies.canned_question(waiting, None).as_deref(),
            Some("Please show me the policy: Waiting List")
        );

        let events = MenuCategory::Protocols.find("special-events").unwrap();
        assert_eq!(
            MenuCategory::Protocols.canned_question(events, Some("YC")).as_deref(),
            Some("Please show me the protocol: Special Events")
        );

        let handbook = &MenuCategory::Handbook.items()[0];
        assert_eq!(
            MenuCategory::Handbook.canned_question(handbook, Some("TC")).as_deref(),
            Some("Please show my campus Parent Handbook (TC).")
        );
        assert_eq!(MenuCategory::Handbook.canned_question(handbook, None), None);
        assert_eq!(MenuCategory::Handbook.canned_question(handbook, Some(" ")), None);
    }

    #[test]
    fn test_toggle_semantics() {
        let mut panel = MenuPanel::default();
        assert!(panel.toggle(MenuCategory::Policies).is_some());
        assert_eq!(panel.open_category(), Some(MenuCategory::Policies));

        // Switching does not need an explicit close
        let items = panel.toggle(MenuCategory::Protocols).unwrap();
        assert_eq!(items.len(), 12);
        assert_eq!(panel.open_category(), Some(MenuCategory::Protocols));

        // Same toggle again closes
        assert!(panel.toggle(MenuCategory::Protocols).is_none());
        assert_eq!(panel.open_category(), None);
    }

    #[test]
    fn test_handbook_disabled_without_campus() {
        assert!(!MenuPanel::is_enabled(MenuCategory::Handbook, None));
        assert!(MenuPanel::is_enabled(MenuCategory::Handbook, Some("SC")));
        assert!(MenuPanel::is_enabled(MenuCategory::Policies, None));
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("Policies".parse::<MenuCategory>().unwrap(), MenuCategory::Policies);
        assert_eq!("protocol".parse::<MenuCategory>().unwrap(), MenuCategory::Protocols);
        assert_eq!("handbook".parse::<MenuCategory>().unwrap(), MenuCategory::Handbook);
        assert!("menu".parse::<MenuCategory>().is_err());
    }
}
