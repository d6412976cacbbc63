//! Text and button-action routing.
//!
//! Both tables are immutable and built once at startup. Routes are evaluated
//! in registration order and the first match wins; nothing falls through.

use crate::images::StaticChart;
use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;
use thiserror::Error;

/// First run of letters in a message, taken as a country or region query.
static RE_COUNTRY: Lazy<Regex> = lazy_regex!(r"(?i)([a-zA-Z][a-zA-Z' \-]+)");

/// `detail <country> <group>` buttons under a country caption.
static RE_DETAIL: Lazy<Regex> =
    lazy_regex!(r"(?i)detail+[ ]+([a-zA-Z][a-zA-Z' \-]+)[ ]+(top|bot|all|sorted)");

/// `coronaregion <region> <group>` buttons under a region caption.
static RE_REGION: Lazy<Regex> = lazy_regex!(
    r"(?i)coronaregion (europe|afr|latin a|north[ern]* a|asia|ocea|world|xworld)[a-z' &\-]*?[ ]+(top|all|bot|sorted|chart)"
);

/// Action-id of the top-20 deaths chart button.
pub const ACTION_TOP_DEATHS: &str = "corona-deaths-top-20";

/// Errors raised while building a routing table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// A catch-all route would shadow later routes
    #[error("Catch-all route at position {0} must be registered last")]
    CatchAllNotLast(usize),
}

/// Predicate over inbound text or action-ids.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive equality with the trimmed input
    Exact(String),
    /// Case-insensitive substring
    Contains(String),
    /// Regex; capture groups become arguments
    Pattern(Regex),
}

impl Matcher {
    /// Case-insensitive exact matcher
    #[must_use]
    pub fn exact(word: &str) -> Self {
        Self::Exact(word.to_lowercase())
    }

    /// Case-insensitive substring matcher
    #[must_use]
    pub fn contains(word: &str) -> Self {
        Self::Contains(word.to_lowercase())
    }

    /// Captured groups if the input matches, `None` otherwise.
    ///
    /// Exact and substring matchers capture nothing.
    #[must_use]
    pub fn captures(&self, input: &str) -> Option<Vec<String>> {
        match self {
            Self::Exact(word) => (input.trim().to_lowercase() == *word).then(Vec::new),
            Self::Contains(word) => input.to_lowercase().contains(word.as_str()).then(Vec::new),
            Self::Pattern(re) => re.captures(input).map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect()
            }),
        }
    }
}

/// What a free-text message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCommand {
    /// Short greeting
    Greeting,
    /// Welcome and command list
    Help,
    /// Notice about the simplified usage
    News,
    /// Countries with data
    List,
    /// Latest atmospheric CO2
    Co2,
    /// One fixed chart
    Chart(StaticChart),
    /// All fixed charts as an album
    Gallery,
    /// Country or region lookup; the catch-all
    Country,
}

/// A routed request, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Short greeting
    Greeting,
    /// Welcome and command list
    Help,
    /// Notice about the simplified usage
    News,
    /// Countries with data
    List,
    /// Latest atmospheric CO2
    Co2,
    /// One fixed chart
    Chart(StaticChart),
    /// All fixed charts as an album
    Gallery,
    /// A sticker was received
    Sticker,
    /// Country or region lookup
    Country(String),
}

impl TextCommand {
    fn into_intent(self, mut args: Vec<String>) -> Intent {
        match self {
            Self::Greeting => Intent::Greeting,
            Self::Help => Intent::Help,
            Self::News => Intent::News,
            Self::List => Intent::List,
            Self::Co2 => Intent::Co2,
            Self::Chart(chart) => Intent::Chart(chart),
            Self::Gallery => Intent::Gallery,
            Self::Country => Intent::Country(if args.is_empty() {
                String::new()
            } else {
                args.swap_remove(0)
            }),
        }
    }
}

/// One (matcher, command) pair.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: Matcher,
    command: TextCommand,
    catch_all: bool,
}

impl Route {
    /// Ordinary route
    #[must_use]
    pub const fn new(matcher: Matcher, command: TextCommand) -> Self {
        Self {
            matcher,
            command,
            catch_all: false,
        }
    }

    /// Catch-all route; must be the last one in its table
    #[must_use]
    pub const fn catch_all(matcher: Matcher, command: TextCommand) -> Self {
        Self {
            matcher,
            command,
            catch_all: true,
        }
    }
}

/// Ordered free-text routing table.
#[derive(Debug, Clone)]
pub struct CommandTable {
    routes: Vec<Route>,
}

impl CommandTable {
    /// Build a table from routes in priority order.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::CatchAllNotLast` if a catch-all route is
    /// followed by other routes.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouterError> {
        let last = routes.len().saturating_sub(1);
        if let Some(pos) = routes.iter().position(|r| r.catch_all) {
            if pos != last {
                return Err(RouterError::CatchAllNotLast(pos));
            }
        }
        Ok(Self { routes })
    }

    /// The bot's command table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            routes: standard_routes(),
        }
    }

    /// First matching route's intent, or `None` if nothing matches.
    #[must_use]
    pub fn route(&self, text: &str) -> Option<Intent> {
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .captures(text)
                .map(|args| route.command.into_intent(args))
        })
    }
}

fn standard_routes() -> Vec<Route> {
    vec![
        Route::new(Matcher::exact("hi"), TextCommand::Greeting),
        Route::new(Matcher::contains("start"), TextCommand::Help),
        Route::new(Matcher::contains("help"), TextCommand::Help),
        Route::new(Matcher::contains("coro"), TextCommand::News),
        Route::new(Matcher::contains("list"), TextCommand::List),
        Route::new(Matcher::exact("co2"), TextCommand::Co2),
        Route::new(
            Matcher::contains("renewable"),
            TextCommand::Chart(StaticChart::Renewables),
        ),
        Route::new(
            Matcher::exact("emissions"),
            TextCommand::Chart(StaticChart::Emissions),
        ),
        Route::new(Matcher::exact("wri"), TextCommand::Chart(StaticChart::Wri)),
        Route::new(Matcher::exact("charts"), TextCommand::Gallery),
        Route::catch_all(
            Matcher::Pattern(RE_COUNTRY.clone()),
            TextCommand::Country,
        ),
    ]
}

/// Which slice of a ranked list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListGroup {
    /// Everything, ranked
    All,
    /// Everything, in API (alphabetical) order
    Sorted,
    /// Ten highest
    Top,
    /// Ten lowest
    Bottom,
    /// Everything, ranked, preceded by the region chart
    Chart,
}

impl ListGroup {
    /// Parse a group keyword
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "sorted" => Some(Self::Sorted),
            "top" => Some(Self::Top),
            "bot" => Some(Self::Bottom),
            "chart" => Some(Self::Chart),
            _ => None,
        }
    }

    /// Keyword used in action-ids
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Sorted => "sorted",
            Self::Top => "top",
            Self::Bottom => "bot",
            Self::Chart => "chart",
        }
    }
}

/// A routed button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Sub-national regions of a country
    Detail {
        /// Country, lowercased
        country: String,
        /// Slice to show
        group: ListGroup,
    },
    /// Top-20 deaths chart
    TopDeaths,
    /// Countries of a world region
    Region {
        /// Region key, lowercased (e.g. `europe`, `latin a`)
        region: String,
        /// Slice to show
        group: ListGroup,
    },
    /// Anything else; acknowledged without acting
    Unknown(String),
}

/// What an action route produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Detail,
    TopDeaths,
    Region,
}

/// Ordered button-action routing table.
#[derive(Debug, Clone)]
pub struct ActionTable {
    routes: Vec<(Matcher, ActionKind)>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionTable {
    /// The bot's action table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            routes: vec![
                (Matcher::Pattern(RE_DETAIL.clone()), ActionKind::Detail),
                (Matcher::exact(ACTION_TOP_DEATHS), ActionKind::TopDeaths),
                (Matcher::Pattern(RE_REGION.clone()), ActionKind::Region),
            ],
        }
    }

    /// Route an action-id; unmatched ids become [`Action::Unknown`].
    #[must_use]
    pub fn route(&self, action_id: &str) -> Action {
        self.routes
            .iter()
            .find_map(|(matcher, kind)| {
                matcher
                    .captures(action_id)
                    .and_then(|args| build_action(*kind, &args))
            })
            .unwrap_or_else(|| Action::Unknown(action_id.to_string()))
    }
}

fn build_action(kind: ActionKind, args: &[String]) -> Option<Action> {
    match kind {
        ActionKind::TopDeaths => Some(Action::TopDeaths),
        ActionKind::Detail => {
            let country = args.first()?.trim().to_lowercase();
            let group = ListGroup::parse(args.get(1)?)?;
            Some(Action::Detail { country, group })
        }
        ActionKind::Region => {
            let region = args.first()?.to_lowercase();
            let group = ListGroup::parse(args.get(1)?)?;
            Some(Action::Region { region, group })
        }
    }
}

/// Action-id for a country detail button
#[must_use]
pub fn detail_action(country: &str, group: ListGroup) -> String {
    format!("detail {country} {}", group.keyword())
}

/// Action-id for a world-region button
#[must_use]
pub fn region_action(region: &str, group: ListGroup) -> String {
    format!("coronaregion {region} {}", group.keyword())
}
