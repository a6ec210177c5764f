use serde::{Deserialize, Serialize};

/// Which translator handles a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Direction {
    #[default]
    PmToDev,
    DevToPm,
}

/// Fixed display metadata for a direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AgentMeta {
    pub(crate) name: &'static str,
    pub(crate) title: &'static str,
    pub(crate) avatar: &'static str,
}

const PM_TO_DEV_META: AgentMeta = AgentMeta {
    name: "需求转译官",
    title: "PM ➔ Dev",
    avatar: "assets/avatar_pm_new.png",
};

const DEV_TO_PM_META: AgentMeta = AgentMeta {
    name: "技术转译官",
    title: "Dev ➔ PM",
    avatar: "assets/avatar_dev_new.png",
};

impl Direction {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Direction::PmToDev => "pm_to_dev",
            Direction::DevToPm => "dev_to_pm",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pm_to_dev" | "pm-to-dev" => Some(Direction::PmToDev),
            "dev_to_pm" | "dev-to-pm" => Some(Direction::DevToPm),
            _ => None,
        }
    }

    pub(crate) fn meta(&self) -> AgentMeta {
        match self {
            Direction::PmToDev => PM_TO_DEV_META,
            Direction::DevToPm => DEV_TO_PM_META,
        }
    }

    /// Name used in the canonical `@<role> ` mention prefix.
    pub(crate) fn role_name(&self) -> &'static str {
        self.meta().name
    }

    pub(crate) fn toggled(self) -> Self {
        match self {
            Direction::PmToDev => Direction::DevToPm,
            Direction::DevToPm => Direction::PmToDev,
        }
    }

    pub(crate) fn all() -> [Direction; 2] {
        [Direction::PmToDev, Direction::DevToPm]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&Direction::PmToDev).unwrap(),
            "\"pm_to_dev\""
        );
        assert_eq!(
            serde_json::to_string(&Direction::DevToPm).unwrap(),
            "\"dev_to_pm\""
        );
    }

    #[test]
    fn parse_accepts_wire_names() {
        for direction in Direction::all() {
            assert_eq!(Direction::parse(direction.as_str()), Some(direction));
        }
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn role_names_are_distinct() {
        assert_ne!(
            Direction::PmToDev.role_name(),
            Direction::DevToPm.role_name()
        );
    }
}
