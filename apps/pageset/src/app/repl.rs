//! Line-oriented browser. Fetches run as spawned tasks and report back over a
//! channel, so paging quickly with latency configured produces replies that
//! arrive out of order; the client keeps only the latest.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::error::CliError;
use crate::client::{LoadOutcome, PageRequest, PagedSelection, view};
use crate::model::{Page, Record};
use crate::source::SourceError;

type Reply = (PageRequest, Result<Page, SourceError>);

const HELP: &str = "\
commands:
  page N        load page N
  next | prev   move one page
  toggle I      toggle row I (0-based) on the loaded page
  rows I J ..   set exactly these rows as the page's selection
  all on|off    select or deselect every row on the page
  bulk N        select the first N records of the whole set
  clear         clear the selection
  show          print the loaded page
  ids           print the raw selection ids
  wait          wait for in-flight page loads
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Page(u64),
    Next,
    Prev,
    Toggle(usize),
    Rows(Vec<usize>),
    All(bool),
    Bulk(Option<String>),
    Clear,
    Show,
    Ids,
    Wait,
    Help,
    Quit,
}

/// Parses one input line; `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let index = |word: &str| {
        word.parse::<usize>()
            .map_err(|_| format!("'{word}' is not a row index"))
    };
    let command = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("page" | "p", [number]) => {
            let number = number
                .parse::<u64>()
                .map_err(|_| format!("'{number}' is not a page number"))?;
            if number == 0 {
                return Err("pages start at 1".to_string());
            }
            ReplCommand::Page(number)
        }
        ("next" | "n", []) => ReplCommand::Next,
        ("prev" | "previous", []) => ReplCommand::Prev,
        ("toggle" | "t", [row]) => ReplCommand::Toggle(index(row)?),
        ("rows", rows) => ReplCommand::Rows(
            rows.iter()
                .map(|row| index(row))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ("all", ["on"]) => ReplCommand::All(true),
        ("all", ["off"]) => ReplCommand::All(false),
        ("bulk" | "b", []) => ReplCommand::Bulk(None),
        ("bulk" | "b", [count]) => ReplCommand::Bulk(Some((*count).to_string())),
        ("clear", []) => ReplCommand::Clear,
        ("show" | "s", []) => ReplCommand::Show,
        ("ids", []) => ReplCommand::Ids,
        ("wait", []) => ReplCommand::Wait,
        ("help" | "?", []) => ReplCommand::Help,
        ("quit" | "exit" | "q", []) => ReplCommand::Quit,
        _ => return Err(format!("unrecognized command '{}'; try 'help'", line.trim())),
    };
    Ok(Some(command))
}

struct Loads {
    tx: mpsc::UnboundedSender<Reply>,
    rx: mpsc::UnboundedReceiver<Reply>,
    in_flight: usize,
}

impl Loads {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    fn spawn(&mut self, client: &mut PagedSelection, page: u64) {
        let request = client.begin_load(page);
        let source = client.source();
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = source.fetch_page(request.page).await;
            let _ = tx.send((request, result));
        });
    }

    async fn drain<W: Write>(
        &mut self,
        client: &mut PagedSelection,
        out: &mut W,
    ) -> Result<(), CliError> {
        while self.in_flight > 0 {
            let Some((request, result)) = self.rx.recv().await else {
                break;
            };
            self.in_flight -= 1;
            report(out, client, request, result)?;
        }
        Ok(())
    }
}

fn report<W: Write>(
    out: &mut W,
    client: &mut PagedSelection,
    request: PageRequest,
    result: Result<Page, SourceError>,
) -> Result<(), CliError> {
    match client.complete_load(request, result) {
        LoadOutcome::Applied(report) => {
            write!(out, "loaded page {}", report.page)?;
            if report.resolved > 0 {
                write!(out, ", resolved {} pending", report.resolved)?;
            }
            writeln!(out)?;
        }
        LoadOutcome::Stale { request, .. } => {
            writeln!(out, "dropped late reply for page {}", request.page)?;
        }
        LoadOutcome::Failed(err) => writeln!(out, "error: {err}")?,
    }
    Ok(())
}

/// Runs commands from `input` until `quit` or end of input.
///
/// Page 1 is requested on start; loads still in flight at end of input are
/// awaited before the final status line.
pub async fn run<R, W>(mut client: PagedSelection, input: R, out: &mut W) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut loads = Loads::new();
    let mut lines = input.lines();
    let mut input_open = true;
    loads.spawn(&mut client, 1);

    while input_open || loads.in_flight > 0 {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(ReplCommand::Quit)) => break,
                    Ok(Some(ReplCommand::Wait)) => loads.drain(&mut client, out).await?,
                    Ok(Some(command)) => execute(&mut client, &mut loads, command, out)?,
                    Err(message) => writeln!(out, "error: {message}")?,
                }
            }
            Some((request, result)) = loads.rx.recv(), if loads.in_flight > 0 => {
                loads.in_flight -= 1;
                report(out, &mut client, request, result)?;
            }
        }
    }

    writeln!(out, "{}", view::status_line(&client))?;
    out.flush()?;
    Ok(())
}

fn execute<W: Write>(
    client: &mut PagedSelection,
    loads: &mut Loads,
    command: ReplCommand,
    out: &mut W,
) -> Result<(), CliError> {
    debug!(target: "pageset::app", ?command, "executing command");
    match command {
        ReplCommand::Page(number) => loads.spawn(client, number),
        ReplCommand::Next => {
            let next = client.current_page().number + 1;
            if next > client.page_count() {
                writeln!(out, "already on the last page")?;
            } else {
                loads.spawn(client, next);
            }
        }
        ReplCommand::Prev => {
            let current = client.current_page().number;
            if current <= 1 {
                writeln!(out, "already on the first page")?;
            } else {
                loads.spawn(client, current - 1);
            }
        }
        ReplCommand::Toggle(row) => match client.current_page().record_at(row).cloned() {
            Some(record) => {
                let selected = client.on_row_toggle(&record);
                let mark = if selected { 'x' } else { ' ' };
                writeln!(out, "[{mark}] {}", record.label())?;
            }
            None => writeln!(out, "error: no row {row} on this page")?,
        },
        ReplCommand::Rows(rows) => {
            let page = client.current_page();
            let mut records: Vec<Record> = Vec::with_capacity(rows.len());
            for row in rows {
                match page.record_at(row) {
                    Some(record) => records.push(record.clone()),
                    None => {
                        writeln!(out, "error: no row {row} on this page")?;
                        return Ok(());
                    }
                }
            }
            let checked = !records.is_empty();
            client.on_page_selection_change(&records, checked);
            writeln!(out, "{}", view::status_line(client))?;
        }
        ReplCommand::All(checked) => {
            client.on_select_all_change(checked);
            writeln!(out, "{}", view::status_line(client))?;
        }
        ReplCommand::Bulk(count) => match client.on_bulk_select(count.as_deref()) {
            Ok(selected) => writeln!(out, "selected the first {selected} records")?,
            Err(err) => writeln!(out, "error: {err}")?,
        },
        ReplCommand::Clear => {
            client.on_clear_all();
            writeln!(out, "{}", view::status_line(client))?;
        }
        ReplCommand::Show => write!(out, "{}", view::render_page(client))?,
        ReplCommand::Ids => {
            let ids: Vec<String> = client
                .selection()
                .raw_ids()
                .iter()
                .map(i64::to_string)
                .collect();
            writeln!(out, "{}", ids.join(" "))?;
        }
        ReplCommand::Help => writeln!(out, "{HELP}")?,
        ReplCommand::Wait | ReplCommand::Quit => {}
    }
    Ok(())
}
