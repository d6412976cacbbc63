//! Conversational flows.
//!
//! [`StatsBot`] routes inbound text and button presses, fetches what the
//! request needs, composes the reply and plays it through a
//! [`ChatTransport`]. Fetch and data errors are caught here and turned into
//! one generic apology; lookup misses are ordinary replies.

use crate::client::{fetch_records, Endpoint, FlowError, StatsApi};
use crate::config::BotSettings;
use crate::flow::{FlowController, PlaybackReport};
use crate::format::{
    bold, code, day_label, escape, format_rate, italic, parse_date, percent_change,
    rate_per_100k, relative_day, split_message, trend_indicator, week_ending, GLYPH_DOWN,
    GLYPH_UP, MESSAGE_LIMIT,
};
use crate::images::{ImageStore, StaticChart};
use crate::records::{Co2Reading, CountrySummary, RegionalReport};
use crate::reply::{ButtonMenu, Outbound, Sequence};
use crate::resolve::{normalize_query, resolve_by_name};
use crate::router::{
    detail_action, region_action, Action, ActionTable, CommandTable, Intent, ListGroup,
    ACTION_TOP_DEATHS,
};
use crate::transport::{ChatId, ChatTransport};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reply for any fetch or data failure.
pub const GENERIC_FAILURE: &str = "Ouch, something went wrong, sorry 😟. Please try again!";

/// Rows kept for top/bottom slices.
const SLICE_LEN: usize = 10;
/// Weekly values needed for a sub-region trend.
const MIN_WEEKLY_POINTS: usize = 5;
/// Daily values needed for a country trend (four 14-day windows, a week apart).
const MIN_DAILY_POINTS: usize = 36;
/// World regions too small for top/bottom menus.
const SMALL_REGIONS: &[&str] = &["Oceania", "Northern America"];

/// Who sent a message or pressed a button.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    /// Platform user id
    pub user_id: i64,
    /// First name shown in greetings
    pub first_name: String,
    /// Optional handle
    pub username: Option<String>,
}

impl Requester {
    /// Handle if set, first name otherwise
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.username {
            Some(username) if !username.is_empty() => username.as_str(),
            _ if !self.first_name.is_empty() => self.first_name.as_str(),
            _ => "Unknown",
        }
    }
}

/// A button press as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPress {
    /// Id used to acknowledge the press
    pub query_id: String,
    /// Action-id attached to the button
    pub data: String,
    /// Chat the button was shown in, if still accessible
    pub chat: Option<ChatId>,
    /// Who pressed it
    pub from: Requester,
}

/// The statistics bot: routing tables, data source and reply composition.
pub struct StatsBot {
    api: Arc<dyn StatsApi>,
    settings: Arc<BotSettings>,
    images: ImageStore,
    commands: CommandTable,
    actions: ActionTable,
    shutdown: CancellationToken,
    today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

impl StatsBot {
    /// Bot with the standard routing tables.
    #[must_use]
    pub fn new(api: Arc<dyn StatsApi>, settings: Arc<BotSettings>) -> Self {
        let images = ImageStore::new(settings.image_dir.clone());
        Self {
            api,
            settings,
            images,
            commands: CommandTable::standard(),
            actions: ActionTable::standard(),
            shutdown: CancellationToken::new(),
            today: utc_today,
        }
    }

    /// Replace the text routing table
    #[must_use]
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Replace the clock used for relative dates
    #[must_use]
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Image store in use
    #[must_use]
    pub const fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Cancelling this token stops every pending delayed message
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn controller(&self) -> FlowController {
        FlowController::with_cancellation(self.shutdown.child_token())
    }

    /// Route free text and run the selected flow.
    ///
    /// Text that matches no route is ignored.
    pub async fn handle_text(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        from: &Requester,
        text: &str,
    ) -> PlaybackReport {
        match self.commands.route(text) {
            Some(intent) => self.handle_intent(transport, chat, from, intent).await,
            None => {
                debug!(user = from.display_name(), "No route for text");
                PlaybackReport::default()
            }
        }
    }

    /// Run the flow for an already-routed intent.
    pub async fn handle_intent(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        from: &Requester,
        intent: Intent,
    ) -> PlaybackReport {
        info!(user = from.display_name(), intent = ?intent, "Handling message");

        let outcome = match intent {
            Intent::Greeting => Ok(Sequence::single(Outbound::text("Hey there"))),
            Intent::Sticker => Ok(Sequence::single(Outbound::text("Nice sticker 👍"))),
            Intent::Help => Ok(self.help(from)),
            Intent::News => Ok(Sequence::single(Outbound::text(news_text(from)))),
            Intent::Chart(chart) => Ok(self.static_chart(chart)),
            Intent::Gallery => Ok(self.gallery()),
            Intent::Co2 => self.co2(transport, chat, from).await,
            Intent::List => self.list(transport, chat, from).await,
            Intent::Country(query) => self.country(transport, chat, from, &query).await,
        };

        self.finish(transport, chat, outcome).await
    }

    /// Route a button press, acknowledge it and run the selected flow.
    pub async fn handle_action(
        &self,
        transport: &dyn ChatTransport,
        press: &ActionPress,
    ) -> PlaybackReport {
        let action = self.actions.route(&press.data);
        info!(user = press.from.display_name(), action = ?action, "Handling button");

        let acknowledgment = match &action {
            Action::Unknown(id) => Some(format!("Oh, {id}! I don't know how to respond to that")),
            _ => None,
        };
        if let Err(e) = transport.answer_callback(&press.query_id, acknowledgment).await {
            warn!("Failed to answer callback {}: {e}", press.query_id);
        }

        let Some(chat) = press.chat else {
            warn!(action = ?action, "Button press without an accessible chat");
            return PlaybackReport::default();
        };

        let outcome = match action {
            Action::Unknown(_) => return PlaybackReport::default(),
            Action::TopDeaths => Ok(self.top_deaths()),
            Action::Detail { country, group } => self.detail(&country, group).await,
            Action::Region { region, group } => self.region(&region, group).await,
        };

        self.finish(transport, chat, outcome).await
    }

    /// Stop the client's spinner for a press that carries no action-id.
    pub async fn acknowledge(&self, transport: &dyn ChatTransport, query_id: &str) {
        if let Err(e) = transport.answer_callback(query_id, None).await {
            warn!("Failed to answer callback {query_id}: {e}");
        }
    }

    async fn finish(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        outcome: Result<Sequence, FlowError>,
    ) -> PlaybackReport {
        let sequence = match outcome {
            Ok(sequence) => sequence,
            Err(e) => {
                error!(chat, "Flow failed: {e}");
                Sequence::single(Outbound::text(GENERIC_FAILURE))
            }
        };
        self.controller().play(transport, chat, sequence).await
    }

    async fn notify(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        text: String,
    ) -> Result<(), FlowError> {
        transport.send_text(chat, &text, None).await?;
        Ok(())
    }

    fn help(&self, from: &Requester) -> Sequence {
        let delays = &self.settings.delays;
        Sequence::new()
            .now(Outbound::text(format!("Hi {}!", escape(&from.first_name))))
            .after(
                delays.help_commands(),
                Outbound::text(
                    "Here are some commands you can try:\n\n\
                     world\nlist\neuro\nfrance\nco2\nrenewables\ncharts\n\
                     ...or just type in the first few letters of a country or world region and see what happens",
                ),
            )
            .after(
                delays.help_hint(),
                Outbound::text(format!("Just type {} for this message", code("help"))),
            )
    }

    fn static_chart(&self, chart: StaticChart) -> Sequence {
        match self.images.static_chart(chart) {
            Some(path) => Sequence::single(Outbound::photo(path)),
            None => {
                warn!(file = chart.file_name(), "Static chart missing");
                Sequence::single(Outbound::text("That chart is not available right now"))
            }
        }
    }

    fn gallery(&self) -> Sequence {
        let mut charts = self.images.gallery();
        match charts.len() {
            0 => Sequence::single(Outbound::text("No charts are available right now")),
            // Albums need at least two items.
            1 => Sequence::single(Outbound::photo(charts.remove(0))),
            _ => Sequence::single(Outbound::MediaGroup(charts)),
        }
    }

    fn top_deaths(&self) -> Sequence {
        match self.images.static_chart(StaticChart::TopDeaths) {
            Some(path) => Sequence::single(Outbound::photo_with_caption(
                path,
                "These are the countries with the highest number of deaths per million, \
                 we update this chart every day.",
            )),
            None => Sequence::single(Outbound::text("That chart is not available right now")),
        }
    }

    async fn co2(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        from: &Requester,
    ) -> Result<Sequence, FlowError> {
        self.notify(
            transport,
            chat,
            format!(
                "{}, please wait while I get the latest CO2 measurements for you",
                escape(&from.first_name)
            ),
        )
        .await?;

        let readings: Vec<Co2Reading> = fetch_records(self.api.as_ref(), Endpoint::Co2Daily).await?;
        let latest = readings
            .last()
            .ok_or_else(|| FlowError::Malformed("maunaloaco2-daily: empty series".to_string()))?;

        Ok(Sequence::single(Outbound::text(co2_caption(
            latest,
            (self.today)(),
        ))))
    }

    async fn list(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        from: &Requester,
    ) -> Result<Sequence, FlowError> {
        self.notify(
            transport,
            chat,
            format!(
                "{}, please wait while we get the list of countries we have data for",
                escape(&from.first_name)
            ),
        )
        .await?;

        let summaries: Vec<CountrySummary> =
            fetch_records(self.api.as_ref(), Endpoint::DeathsSummary).await?;
        let names = summaries
            .iter()
            .map(|s| escape(&s.country))
            .collect::<Vec<_>>()
            .join("\n");

        let sequence = split_message(&names, MESSAGE_LIMIT)
            .into_iter()
            .fold(Sequence::new(), |seq, part| seq.now(Outbound::text(part)));

        Ok(sequence.after(
            self.settings.delays.list_hint(),
            Outbound::text(
                "Just type the first letter of the name of a country in this list to get the latest information",
            ),
        ))
    }

    async fn country(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        from: &Requester,
        query: &str,
    ) -> Result<Sequence, FlowError> {
        let query = normalize_query(query);
        info!(user = from.display_name(), query = %query, "Country lookup");

        if rand::random::<f64>() < self.settings.wait_notice_probability {
            self.notify(
                transport,
                chat,
                format!(
                    "{}, please wait - getting data from Johns Hopkins University",
                    escape(&from.first_name)
                ),
            )
            .await?;
        }

        let deaths: Vec<CountrySummary> =
            fetch_records(self.api.as_ref(), Endpoint::DeathsSummary).await?;
        let Some(dead) = resolve_by_name(&deaths, &query, |s| s.country.as_str()) else {
            return Ok(not_found(&query));
        };

        let cases: Vec<CountrySummary> =
            fetch_records(self.api.as_ref(), Endpoint::ConfirmedSummary).await?;
        let Some(confirmed) = resolve_by_name(&cases, &query, |s| s.country.as_str()) else {
            return Ok(not_found(&query));
        };

        info!(country = %dead.country, region = ?dead.region, "Summaries resolved");

        let caption = country_caption(dead, confirmed)?;
        let menu = self.country_menu(dead, &query).await?;
        let chart = self.images.covid_chart(&dead.country).map(Outbound::photo);

        Ok(Sequence::new().maybe(std::time::Duration::ZERO, chart).after(
            self.settings.delays.country_caption(),
            Outbound::text_with_menu(caption, menu),
        ))
    }

    async fn country_menu(
        &self,
        summary: &CountrySummary,
        query: &str,
    ) -> Result<ButtonMenu, FlowError> {
        let name = summary.country.as_str();

        if summary.is_world() {
            debug!(country = name, "World menu");
            return ButtonMenu::with_columns(2)
                .button("World regions", region_action(name, ListGroup::All))
                .and_then(|m| m.button("Top 20 countries", ACTION_TOP_DEATHS))
                .map_err(|e| FlowError::Malformed(e.to_string()));
        }

        if summary.is_world_region() {
            debug!(country = name, "World region menu");
            let mut groups = vec![
                ("All", ListGroup::All),
                ("Alphabetical", ListGroup::Sorted),
                ("Top 10", ListGroup::Top),
                ("Bottom 10", ListGroup::Bottom),
            ];
            if SMALL_REGIONS.contains(&name) {
                groups.truncate(2);
            }
            return group_menu(&groups, |group| region_action(name, group));
        }

        debug!(country = name, "Sub-national menu");
        let reports: Vec<RegionalReport> =
            fetch_records(self.api.as_ref(), Endpoint::EcdcWeekly).await?;
        // Case data says "UK", ECDC says "United Kingdom".
        let lookup = if query == "uk" {
            "united kingdom".to_string()
        } else {
            name.to_lowercase()
        };
        let Some(report) = reports
            .iter()
            .find(|r| r.country.to_lowercase().starts_with(&lookup))
        else {
            info!(country = name, "No sub-national regions");
            return Ok(ButtonMenu::new());
        };

        let groups = [
            ("All", ListGroup::All),
            ("Alphabetical", ListGroup::Sorted),
            ("Top 10", ListGroup::Top),
            ("Bottom 10", ListGroup::Bottom),
        ];
        group_menu(&groups, |group| detail_action(&report.country, group))
    }

    async fn detail(&self, country: &str, group: ListGroup) -> Result<Sequence, FlowError> {
        let country = if country == "uk" {
            "united kingdom"
        } else {
            country
        };

        let reports: Vec<RegionalReport> =
            fetch_records(self.api.as_ref(), Endpoint::EcdcWeekly).await?;
        let Some(report) = reports
            .iter()
            .find(|r| r.country.to_lowercase().contains(country))
        else {
            return Ok(no_data(country));
        };

        let Some(latest_week) = report
            .region
            .iter()
            .find_map(|r| r.data.last())
            .map(|p| p.t.as_str())
        else {
            return Ok(no_data(country));
        };
        let ending = week_ending(latest_week).ok_or_else(|| {
            FlowError::Malformed(format!("ecdc-weekly: bad week {latest_week:?}"))
        })?;

        let mut rows = Vec::new();
        for sub in &report.region {
            if sub.data.len() < MIN_WEEKLY_POINTS {
                warn!(country = %report.country, region = %sub.name, "Missing weekly data");
                continue;
            }
            let recent: Vec<f64> = sub.data.iter().rev().take(MIN_WEEKLY_POINTS).map(|p| p.v).collect();
            rows.push(Row {
                name: sub.name.clone(),
                latest: recent[0],
                trend: trend_indicator(&recent[..4]),
                value: format!("{}", recent[0]),
            });
        }

        let rows = select(rows, group);
        let mut text = format!(
            "{}\nNew cases per 100.000, 14 days ending {ending}\nThe symbols show the trend over the last 3 weeks\n",
            bold(&report.country)
        );
        for row in &rows {
            text.push_str(&format!("\n{} {}: {}", row.trend, escape(&row.name), bold(&row.value)));
        }
        text.push_str(&format!(
            "\n\n{}",
            italic("Regional data is updated weekly, usually late Wednesday")
        ));

        Ok(text_sequence(&text, ButtonMenu::new()))
    }

    async fn region(&self, region: &str, group: ListGroup) -> Result<Sequence, FlowError> {
        let summaries: Vec<CountrySummary> =
            fetch_records(self.api.as_ref(), Endpoint::ConfirmedSummary).await?;
        let members: Vec<CountrySummary> = summaries
            .into_iter()
            .filter(|s| {
                s.region.as_deref().is_some_and(|r| {
                    let r = r.to_lowercase();
                    r.starts_with(region) || r.contains(region)
                })
            })
            .collect();

        let Some(region_name) = members.first().and_then(|s| s.region.clone()) else {
            return Ok(no_data(region));
        };

        let chart = if group == ListGroup::Chart {
            self.images.covid_chart(&region_name).map(Outbound::photo)
        } else {
            None
        };

        let members = select_by(members, group, |s| {
            s.this14.unwrap_or(0.0) / s.population.max(f64::MIN_POSITIVE)
        });

        let latest_day = members
            .iter()
            .find_map(|s| s.data.last())
            .and_then(|p| day_label(&p.t))
            .ok_or_else(|| {
                FlowError::Malformed(format!("covid-confirmed-summary: no dated series for {region_name}"))
            })?;

        let mut text = format!(
            "{}\nNew cases per 100.000, 14 days ending {latest_day}\nThe {GLYPH_UP} and {GLYPH_DOWN} symbols show trends for the last 3 weeks\n\n",
            bold(&region_name)
        );
        for summary in &members {
            let Some(windows) = fortnight_windows(summary) else {
                debug!(country = %summary.country, "Series too short for trend");
                continue;
            };
            let rate = format_rate(rate_per_100k(windows[0], summary.population));
            text.push_str(&format!(
                "{}{} {}\n",
                trend_indicator(&windows),
                escape(&summary.country),
                bold(&rate)
            ));
        }
        text.push_str(&format!("\n{}", italic("Country data is updated every morning")));

        let mut menu = ButtonMenu::with_columns(2);
        if region == "world" {
            for summary in &members {
                if let Err(e) = menu.push(
                    summary.country.clone(),
                    region_action(&summary.country, ListGroup::Chart),
                ) {
                    warn!("Skipping button: {e}");
                }
            }
        }

        let sequence = Sequence::new().maybe(std::time::Duration::ZERO, chart);
        Ok(text_sequence(&text, menu)
            .into_iter()
            .fold(sequence, |seq, step| seq.after(step.delay, step.message)))
    }
}

/// One line of a ranked sub-region list.
struct Row {
    name: String,
    latest: f64,
    trend: String,
    value: String,
}

fn select(rows: Vec<Row>, group: ListGroup) -> Vec<Row> {
    select_by(rows, group, |r| r.latest)
}

/// Rank descending unless `Sorted`, then keep the requested slice.
fn select_by<T>(mut items: Vec<T>, group: ListGroup, key: impl Fn(&T) -> f64) -> Vec<T> {
    if group != ListGroup::Sorted {
        items.sort_by(|a, b| key(b).total_cmp(&key(a)));
    }
    match group {
        ListGroup::Top => items.truncate(SLICE_LEN),
        ListGroup::Bottom => {
            let skip = items.len().saturating_sub(SLICE_LEN);
            items.drain(..skip);
        }
        ListGroup::All | ListGroup::Sorted | ListGroup::Chart => {}
    }
    items
}

/// Four 14-day deltas of a cumulative series, most recent first, a week apart.
fn fortnight_windows(summary: &CountrySummary) -> Option<[f64; 4]> {
    let data = &summary.data;
    let len = data.len();
    if len < MIN_DAILY_POINTS {
        return None;
    }
    let back = |k: usize| data[len - k].y;
    Some([
        back(1) - back(15),
        back(8) - back(22),
        back(15) - back(29),
        back(22) - back(36),
    ])
}

fn group_menu(
    groups: &[(&str, ListGroup)],
    action: impl Fn(ListGroup) -> String,
) -> Result<ButtonMenu, FlowError> {
    groups
        .iter()
        .try_fold(ButtonMenu::with_columns(2), |menu, (label, group)| {
            menu.button(*label, action(*group))
        })
        .map_err(|e| FlowError::Malformed(e.to_string()))
}

/// Text split to the message limit, with the menu on the last part.
fn text_sequence(text: &str, menu: ButtonMenu) -> Sequence {
    let mut parts = split_message(text, MESSAGE_LIMIT);
    let last = parts.pop().unwrap_or_default();
    parts
        .into_iter()
        .fold(Sequence::new(), |seq, part| seq.now(Outbound::text(part)))
        .now(Outbound::text_with_menu(last, menu))
}

fn news_text(from: &Requester) -> String {
    format!(
        "Hi {}!\nThe bot has been updated and simplified!\nYou should no longer type {}\n\
         Just type in the first few letters of the country name and hit enter\nEnjoy!",
        escape(&from.first_name),
        bold("corona country")
    )
}

fn not_found(query: &str) -> Sequence {
    Sequence::single(Outbound::text(format!(
        "Unable to find {} - sorry 😟",
        bold(query)
    )))
}

fn no_data(what: &str) -> Sequence {
    Sequence::single(Outbound::text(format!("Sorry, no data for {}", escape(what))))
}

/// Caption for the latest CO2 reading.
#[must_use]
pub fn co2_caption(latest: &Co2Reading, today: NaiveDate) -> String {
    let measured = parse_date(&latest.date).map_or_else(
        || format!("at {}", escape(&latest.date)),
        |date| relative_day(date, today),
    );
    format!(
        "Atmospheric CO2: {}ppm (measured {measured}). This is {}% higher than a year ago, \
         and {}% higher than 10 years ago 🤔",
        latest.value,
        percent_change(latest.value, latest.value_last_year),
        percent_change(latest.value, latest.value_10yrs_ago),
    )
}

/// Caption combining a country's deaths and confirmed-cases summaries.
///
/// # Errors
///
/// Returns `FlowError::Malformed` if the deaths total or 14-day cases are missing.
pub fn country_caption(
    deaths: &CountrySummary,
    cases: &CountrySummary,
) -> Result<String, FlowError> {
    let total = deaths.total.ok_or_else(|| {
        FlowError::Malformed(format!("covid-deaths-summary: no total for {}", deaths.country))
    })?;
    let this14 = cases.this14.ok_or_else(|| {
        FlowError::Malformed(format!("covid-confirmed-summary: no this14 for {}", cases.country))
    })?;

    let death_rate = format_rate(rate_per_100k(total, deaths.population));
    let case_rate = format_rate(rate_per_100k(this14, cases.population));

    Ok(format!(
        "{}\nTotal deaths so far: {}\nDeaths per 100.000: {}\nCases per 100.000 last 14 days: {}",
        bold(&deaths.country),
        bold(&total.to_string()),
        bold(&death_rate),
        bold(&case_rate),
    ))
}
