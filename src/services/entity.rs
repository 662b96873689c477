use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Tenant-scoped collection entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Card,
    Team,
    Player,
    Manufacturer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Bool,
    /// Id of a row of another entity, in the same scope
    Ref(Entity),
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind, required: false }
}

const fn required(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind, required: true }
}

/// Maintained by the service or the database, never by callers
pub const SYSTEM_COLUMNS: &[&str] = &["id", "tenant_id", "created_at", "updated_at"];

const MANUFACTURER_COLUMNS: &[Column] = &[
    required("name", ColumnKind::Text),
    col("description", ColumnKind::Text),
];

const TEAM_COLUMNS: &[Column] = &[
    required("name", ColumnKind::Text),
    col("city", ColumnKind::Text),
    col("sport", ColumnKind::Text),
    col("league", ColumnKind::Text),
];

const PLAYER_COLUMNS: &[Column] = &[
    required("firstname", ColumnKind::Text),
    required("lastname", ColumnKind::Text),
    col("team_id", ColumnKind::Ref(Entity::Team)),
    col("position", ColumnKind::Text),
];

const CARD_COLUMNS: &[Column] = &[
    required("year", ColumnKind::Integer),
    col("set_name", ColumnKind::Text),
    col("card_number", ColumnKind::Text),
    col("card_condition", ColumnKind::Text),
    col("notes", ColumnKind::Text),
    col("image_front", ColumnKind::Text),
    col("image_back", ColumnKind::Text),
    col("player_id", ColumnKind::Ref(Entity::Player)),
    col("team_id", ColumnKind::Ref(Entity::Team)),
    col("manufacturer_id", ColumnKind::Ref(Entity::Manufacturer)),
    col("is_rookie", ColumnKind::Bool),
    col("grade", ColumnKind::Real),
    col("purchase_price", ColumnKind::Real),
    col("current_value", ColumnKind::Real),
];

impl Entity {
    pub const ALL: [Entity; 4] = [Entity::Card, Entity::Team, Entity::Player, Entity::Manufacturer];

    pub fn table(self) -> &'static str {
        match self {
            Entity::Card => "cards",
            Entity::Team => "teams",
            Entity::Player => "players",
            Entity::Manufacturer => "manufacturers",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Entity::Card => "card",
            Entity::Team => "team",
            Entity::Player => "player",
            Entity::Manufacturer => "manufacturer",
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Entity::Card => CARD_COLUMNS,
            Entity::Team => TEAM_COLUMNS,
            Entity::Player => PLAYER_COLUMNS,
            Entity::Manufacturer => MANUFACTURER_COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the singular or plural form, as used in URL paths.
impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|e| s == e.name() || s == e.table())
            .ok_or_else(|| format!("unknown entity: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_segments() {
        assert_eq!("cards".parse::<Entity>().unwrap(), Entity::Card);
        assert_eq!("manufacturer".parse::<Entity>().unwrap(), Entity::Manufacturer);
        assert!("users".parse::<Entity>().is_err());
    }

    #[test]
    fn no_entity_exposes_system_columns() {
        for entity in Entity::ALL {
            for column in entity.columns() {
                assert!(!SYSTEM_COLUMNS.contains(&column.name), "{}.{}", entity, column.name);
            }
        }
    }

    #[test]
    fn references_point_at_other_entities() {
        assert_eq!(Entity::Card.column("player_id").map(|c| c.kind), Some(ColumnKind::Ref(Entity::Player)));
        assert_eq!(Entity::Player.column("team_id").map(|c| c.kind), Some(ColumnKind::Ref(Entity::Team)));
        assert!(Entity::Card.column("year").unwrap().required);
    }
}
