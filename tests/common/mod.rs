#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use db_adapter::prelude::*;

const ABORTED: &str = "canceling statement due to user request";

/// What the scripted driver saw.
#[derive(Debug, Default)]
pub struct Journal {
    pub opens: usize,
    pub closes: usize,
    pub blocking_closes: usize,
    pub cancels: usize,
    pub commands: Vec<Command>,
    pub rows_served: usize,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

/// How the scripted driver behaves.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RowValues>>,
    pub affected: u64,
    pub tables: usize,
    pub fail_open: bool,
    pub open_delay: Option<Duration>,
    pub fail_execute: Option<String>,
    pub execute_delay: Option<Duration>,
    pub row_delay: Option<Duration>,
    pub fail_row_at: Option<usize>,
    pub driver_timeout: Option<Duration>,
    /// Finish delayed work even after the canceller fires.
    pub ignore_cancel: bool,
}

impl Script {
    pub fn with_rows(columns: &[&str], rows: Vec<Vec<RowValues>>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
            tables: 1,
            ..Self::default()
        }
    }

    pub fn numbered(count: i64) -> Self {
        Self::with_rows(&["n"], (1..=count).map(|n| vec![RowValues::Int(n)]).collect())
    }
}

pub struct ScriptedConnection {
    script: Script,
    journal: SharedJournal,
    open: bool,
    abort: CancellationToken,
}

impl ScriptedConnection {
    pub fn new(script: Script) -> (Self, SharedJournal) {
        let journal = SharedJournal::default();
        let conn = Self {
            script,
            journal: Arc::clone(&journal),
            open: false,
            abort: CancellationToken::new(),
        };
        (conn, journal)
    }

    fn record(&self, command: &Command) {
        self.journal.lock().unwrap().commands.push(command.clone());
    }

    async fn run(&self, command: &Command) -> Result<(), DbAdapterError> {
        self.record(command);
        if let Some(delay) = self.script.execute_delay {
            pause(delay, &self.abort, self.script.ignore_cancel).await?;
        }
        match &self.script.fail_execute {
            Some(msg) => Err(DbAdapterError::ExecutionError(msg.clone())),
            None => Ok(()),
        }
    }

    fn table(&self) -> ResultSet {
        let mut rs = ResultSet::with_capacity(self.script.rows.len());
        rs.set_column_names(Arc::new(self.script.columns.clone()));
        for row in &self.script.rows {
            rs.add_row_values(row.clone());
        }
        rs
    }
}

#[async_trait]
impl DriverConnection for ScriptedConnection {
    fn state(&self) -> ConnectionState {
        if self.open {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    async fn open(&mut self) -> Result<(), DbAdapterError> {
        if let Some(delay) = self.script.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.fail_open {
            return Err(DbAdapterError::ExecutionError("host unreachable".into()));
        }
        self.open = true;
        self.abort = CancellationToken::new();
        self.journal.lock().unwrap().opens += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DbAdapterError> {
        self.open = false;
        self.journal.lock().unwrap().closes += 1;
        Ok(())
    }

    fn close_blocking(&mut self) -> Result<(), DbAdapterError> {
        self.open = false;
        self.journal.lock().unwrap().blocking_closes += 1;
        Ok(())
    }

    fn canceller(&self) -> Canceller {
        let journal = Arc::clone(&self.journal);
        let abort = self.abort.clone();
        Canceller::new(move || {
            journal.lock().unwrap().cancels += 1;
            abort.cancel();
        })
    }

    fn default_command_timeout(&self) -> Option<Duration> {
        self.script.driver_timeout
    }

    async fn execute_reader(
        &mut self,
        command: &Command,
    ) -> Result<Box<dyn DriverRows>, DbAdapterError> {
        self.run(command).await?;
        Ok(Box::new(ScriptedRows {
            columns: Arc::new(self.script.columns.clone()),
            rows: self.script.rows.clone().into(),
            row_delay: self.script.row_delay,
            fail_row_at: self.script.fail_row_at,
            served: 0,
            journal: Arc::clone(&self.journal),
            abort: self.abort.clone(),
            ignore_cancel: self.script.ignore_cancel,
        }))
    }

    async fn execute_scalar(
        &mut self,
        command: &Command,
    ) -> Result<Option<RowValues>, DbAdapterError> {
        self.run(command).await?;
        Ok(self
            .script
            .rows
            .first()
            .and_then(|row| row.first().cloned()))
    }

    async fn execute_non_query(&mut self, command: &Command) -> Result<u64, DbAdapterError> {
        self.run(command).await?;
        Ok(self.script.affected)
    }

    async fn fill(&mut self, command: &Command) -> Result<DataSet, DbAdapterError> {
        self.run(command).await?;
        let mut data_set = DataSet::new();
        for _ in 0..self.script.tables {
            data_set.push_table(self.table());
        }
        Ok(data_set)
    }
}

impl CustomTypeParameterFactory for ScriptedConnection {
    fn create_custom_parameter(&self, type_name: &str, name: &str, value: RowValues) -> Parameter {
        Parameter::custom(type_name.to_uppercase(), name, value)
    }
}

struct ScriptedRows {
    columns: Arc<Vec<String>>,
    rows: VecDeque<Vec<RowValues>>,
    row_delay: Option<Duration>,
    fail_row_at: Option<usize>,
    served: usize,
    journal: SharedJournal,
    abort: CancellationToken,
    ignore_cancel: bool,
}

#[async_trait]
impl DriverRows for ScriptedRows {
    fn columns(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn read_into(&mut self, values: &mut Vec<RowValues>) -> Result<bool, DbAdapterError> {
        if let Some(delay) = self.row_delay {
            pause(delay, &self.abort, self.ignore_cancel).await?;
        }
        if self.fail_row_at == Some(self.served) {
            return Err(DbAdapterError::ExecutionError("row fetch failed".into()));
        }
        match self.rows.pop_front() {
            Some(row) => {
                *values = row;
                self.served += 1;
                self.journal.lock().unwrap().rows_served += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Sleep like a slow statement; an abort ends the sleep with the server's cancel error.
async fn pause(delay: Duration, abort: &CancellationToken, ignore_cancel: bool) -> Result<(), DbAdapterError> {
    if ignore_cancel {
        tokio::time::sleep(delay).await;
        return Ok(());
    }
    tokio::select! {
        () = tokio::time::sleep(delay) => Ok(()),
        () = abort.cancelled() => Err(DbAdapterError::ExecutionError(ABORTED.into())),
    }
}

pub fn scripted(script: Script) -> (DatabaseAdapter<ScriptedConnection>, SharedJournal) {
    scripted_with(script, AdapterOptions::default())
}

pub fn scripted_with(
    script: Script,
    options: AdapterOptions,
) -> (DatabaseAdapter<ScriptedConnection>, SharedJournal) {
    let (conn, journal) = ScriptedConnection::new(script);
    (DatabaseAdapter::with_options(conn, options), journal)
}

pub fn text(sql: &str) -> Command {
    Command::new(sql, CommandKind::Text)
}
