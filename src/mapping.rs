use serde::{Deserialize, Serialize};

/// A Goodreads "Exclusive Shelf" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoodreadsShelf {
    Read,
    CurrentlyReading,
    ToRead,
}

impl GoodreadsShelf {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "read" => Some(Self::Read),
            "currently-reading" => Some(Self::CurrentlyReading),
            "to-read" => Some(Self::ToRead),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::CurrentlyReading => "currently-reading",
            Self::ToRead => "to-read",
        }
    }

    /// Skoob status to apply for a book on this shelf, if syncing it is supported.
    pub fn to_skoob(self) -> Option<SkoobStatus> {
        match self {
            Self::Read => Some(SkoobStatus::Read),
            Self::CurrentlyReading => Some(SkoobStatus::Reading),
            Self::ToRead => Some(SkoobStatus::WantToRead),
        }
    }
}

impl std::fmt::Display for GoodreadsShelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Skoob bookcase status. The discriminant is the shelf id used by the
/// bookcase endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkoobStatus {
    Read = 1,
    Reading = 2,
    WantToRead = 3,
    Abandoned = 5,
    Rereading = 6,
}

impl SkoobStatus {
    /// Every status Skoob exposes, in shelf id order.
    pub const ALL: [SkoobStatus; 5] = [
        Self::Read,
        Self::Reading,
        Self::WantToRead,
        Self::Abandoned,
        Self::Rereading,
    ];

    pub fn shelf_id(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Read => "Lido",
            Self::Reading => "Lendo",
            Self::WantToRead => "Quero Ler",
            Self::Abandoned => "Abandonei",
            Self::Rereading => "Relendo",
        }
    }

    /// Text the status control may render with. Skoob has shipped several
    /// spellings for the same control, so all are tried in order.
    pub fn text_variants(self) -> &'static [&'static str] {
        match self {
            Self::Read => &["Lido", "lido", "LIDO", "Li"],
            Self::Reading => &["Lendo", "lendo", "LENDO", "Estou lendo"],
            Self::WantToRead => &[
                "Vou Ler",
                "Vou ler",
                "Quero Ler",
                "Quero ler",
                "QUERO LER",
            ],
            Self::Abandoned => &["Abandonei", "abandonei", "ABANDONEI"],
            Self::Rereading => &["Relendo", "relendo", "RELENDO"],
        }
    }

    /// Stable element id of the status button on the detail page.
    pub fn button_id(self) -> Option<&'static str> {
        match self {
            Self::Read => Some("bt_lido"),
            Self::Reading => Some("bt_lendo"),
            Self::WantToRead => Some("bt_quero"),
            Self::Abandoned | Self::Rereading => None,
        }
    }

    /// Goodreads shelf for books under this status. `None` means the status
    /// is excluded from sync and must be skipped.
    pub fn to_goodreads(self) -> Option<GoodreadsShelf> {
        match self {
            Self::Read => Some(GoodreadsShelf::Read),
            Self::Reading => Some(GoodreadsShelf::CurrentlyReading),
            Self::WantToRead => Some(GoodreadsShelf::ToRead),
            Self::Abandoned | Self::Rereading => None,
        }
    }

    /// Statuses with a Goodreads counterpart, paired with it.
    pub fn syncable() -> impl Iterator<Item = (SkoobStatus, GoodreadsShelf)> {
        Self::ALL
            .into_iter()
            .filter_map(|status| status.to_goodreads().map(|shelf| (status, shelf)))
    }
}

impl std::fmt::Display for SkoobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
