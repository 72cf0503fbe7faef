use serde::Serialize;

/// Visual transition played when a slide enters the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    #[serde(rename = "type")]
    pub kind: TransitionKind,
    /// Duration in seconds.
    pub duration: f64,
}

impl Transition {
    pub fn new(kind: TransitionKind, duration: f64) -> Self {
        Self { kind, duration }
    }

    /// Parse a `TYPE[:SECONDS]` spec such as `"fade"` or `"push:0.8"`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (kind, duration) = match spec.split_once(':') {
            Some((k, d)) => {
                let secs: f64 = d
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid transition duration: {d}"))?;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(format!("invalid transition duration: {d}"));
                }
                (k, secs)
            }
            None => (spec, DEFAULT_TRANSITION_SECS),
        };
        let kind = TransitionKind::parse(kind.trim())
            .ok_or_else(|| format!("unknown transition type: {kind}"))?;
        Ok(Self { kind, duration })
    }
}

const DEFAULT_TRANSITION_SECS: f64 = 0.5;

impl Default for Transition {
    fn default() -> Self {
        Self {
            kind: TransitionKind::Fade,
            duration: DEFAULT_TRANSITION_SECS,
        }
    }
}

/// Transition effects understood by the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    None,
    Fade,
    Slide,
    Push,
    Wipe,
    Cover,
    Uncover,
    Cut,
    Zoom,
    Split,
    Dissolve,
}

impl TransitionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "fade" => Some(Self::Fade),
            "slide" => Some(Self::Slide),
            "push" => Some(Self::Push),
            "wipe" => Some(Self::Wipe),
            "cover" => Some(Self::Cover),
            "uncover" => Some(Self::Uncover),
            "cut" => Some(Self::Cut),
            "zoom" => Some(Self::Zoom),
            "split" => Some(Self::Split),
            "dissolve" => Some(Self::Dissolve),
            _ => None,
        }
    }

    /// Map a PresentationML transition element (`p:fade`, `p:push`, ...) by
    /// its local name.
    pub(crate) fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"fade" => Some(Self::Fade),
            b"push" => Some(Self::Push),
            b"wipe" => Some(Self::Wipe),
            b"cover" => Some(Self::Cover),
            b"pull" | b"uncover" => Some(Self::Uncover),
            b"cut" => Some(Self::Cut),
            b"zoom" => Some(Self::Zoom),
            b"split" => Some(Self::Split),
            b"dissolve" => Some(Self::Dissolve),
            _ => None,
        }
    }
}

/// Layout archetype of a slide, inferred from its shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    Blank,
    TitleSlide,
    TitleOnly,
    TitleAndContent,
    TwoContent,
    ContentOnly,
}

impl LayoutKind {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Blank => "Blank",
            Self::TitleSlide => "Title Slide",
            Self::TitleOnly => "Title Only",
            Self::TitleAndContent => "Title and Content",
            Self::TwoContent => "Two Content",
            Self::ContentOnly => "Content Only",
        }
    }
}

/// Named layout of a slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// The layout part's own name when the package declares one, otherwise
    /// the archetype's display name.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayoutKind,
}
