//! Resource cleanup helpers.

use crate::client::{Close, Column, Cursor};
use crate::error::SqlResult;
use crate::value::Value;

fn log_close_failure(_resource: &dyn Close, _err: &crate::error::SqlError) {
    #[cfg(feature = "tracing")]
    tracing::error!(
        target: "sqlbuilder.sql",
        resource = _resource.resource_name(),
        error = %_err,
        "can't close resource",
    );
}

/// Close every resource, continuing past failures.
///
/// Each failure is logged. Returns `true` only if all resources closed.
pub fn close_all<'a, I>(resources: I) -> bool
where
    I: IntoIterator<Item = &'a mut dyn Close>,
{
    let mut all_closed = true;
    for resource in resources {
        if let Err(err) = resource.close() {
            log_close_failure(resource, &err);
            all_closed = false;
        }
    }
    all_closed
}

/// Close a resource after an earlier failure, logging (not returning) any close error.
pub(crate) fn close_quietly(resource: &mut dyn Close) {
    if let Err(err) = resource.close() {
        log_close_failure(resource, &err);
    }
}

/// Run `f` with `resource`, then close it on every path.
///
/// An error from `f` wins over an error from closing; the latter is only logged.
pub(crate) fn with_resource<R, T, F>(mut resource: R, f: F) -> SqlResult<T>
where
    R: Close,
    F: FnOnce(&mut R) -> SqlResult<T>,
{
    let result = f(&mut resource);
    match (result, resource.close()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            log_close_failure(&resource, &close_err);
            Err(err)
        }
    }
}

/// A cursor that also closes the resources it was created from.
///
/// Returned by calls that open a statement on the caller's behalf. Closing the
/// cursor (or dropping it) closes the cursor first and then every owned
/// resource in order.
pub struct AutoCloseCursor<C: Cursor> {
    inner: C,
    owned: Vec<Box<dyn Close>>,
    closed: bool,
}

impl<C: Cursor> AutoCloseCursor<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            owned: Vec::new(),
            closed: false,
        }
    }

    /// Close `resource` together with the cursor.
    pub fn owning(mut self, resource: impl Close + 'static) -> Self {
        self.owned.push(Box::new(resource));
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<C: Cursor> Close for AutoCloseCursor<C> {
    /// Closes everything; returns the first failure after attempting all.
    fn close(&mut self) -> SqlResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_err = None;
        let resources =
            std::iter::once(&mut self.inner as &mut dyn Close).chain(self.owned.iter_mut().map(|r| r as &mut dyn Close));
        for resource in resources {
            if let Err(err) = resource.close() {
                log_close_failure(resource, &err);
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn resource_name(&self) -> &'static str {
        self.inner.resource_name()
    }
}

impl<C: Cursor> Cursor for AutoCloseCursor<C> {
    fn advance(&mut self) -> SqlResult<bool> {
        self.inner.advance()
    }

    fn value(&mut self, column: Column<'_>) -> SqlResult<Value> {
        self.inner.value(column)
    }

    fn was_null(&self) -> bool {
        self.inner.was_null()
    }

    fn column_names(&self) -> SqlResult<Vec<String>> {
        self.inner.column_names()
    }

    fn find_column(&self, label: &str) -> SqlResult<usize> {
        self.inner.find_column(label)
    }
}

impl<C: Cursor> Drop for AutoCloseCursor<C> {
    fn drop(&mut self) {
        if !self.closed {
            // Failures are logged by close.
            let _ = self.close();
        }
    }
}

impl<C: Cursor + std::fmt::Debug> std::fmt::Debug for AutoCloseCursor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoCloseCursor")
            .field("inner", &self.inner)
            .field("owned", &self.owned.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlError;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct Tracked {
        name: &'static str,
        fail: bool,
        log: Log,
    }

    impl Close for Tracked {
        fn close(&mut self) -> SqlResult<()> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(SqlError::driver(format!("{} failed", self.name)))
            } else {
                Ok(())
            }
        }
    }

    impl Cursor for Tracked {
        fn advance(&mut self) -> SqlResult<bool> {
            Ok(false)
        }

        fn value(&mut self, column: Column<'_>) -> SqlResult<Value> {
            Err(SqlError::ColumnNotFound(column.to_string()))
        }

        fn was_null(&self) -> bool {
            false
        }

        fn column_names(&self) -> SqlResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn find_column(&self, label: &str) -> SqlResult<usize> {
            Err(SqlError::ColumnNotFound(label.to_string()))
        }
    }

    fn tracked(name: &'static str, fail: bool, log: &Log) -> Tracked {
        Tracked {
            name,
            fail,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn close_all_attempts_every_resource() {
        let log = Log::default();
        let mut a = tracked("a", false, &log);
        let mut b = tracked("b", true, &log);
        let mut c = tracked("c", false, &log);
        let ok = close_all([
            &mut a as &mut dyn Close,
            &mut b as &mut dyn Close,
            &mut c as &mut dyn Close,
        ]);
        assert!(!ok);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);

        let mut d = tracked("d", false, &log);
        assert!(close_all([&mut d as &mut dyn Close]));
    }

    #[test]
    fn with_resource_keeps_original_error() {
        let log = Log::default();
        let res: SqlResult<()> = with_resource(tracked("stmt", true, &log), |_| {
            Err(SqlError::driver("query failed"))
        });
        assert!(matches!(res, Err(SqlError::Driver(ref m)) if m == "query failed"));
        assert_eq!(*log.borrow(), vec!["stmt"]);
    }

    #[test]
    fn with_resource_reports_close_error_after_success() {
        let log = Log::default();
        let res = with_resource(tracked("stmt", true, &log), |_| Ok(1));
        assert!(matches!(res, Err(SqlError::Driver(ref m)) if m == "stmt failed"));
    }

    #[test]
    fn auto_close_cursor_closes_owned_resources_once() {
        let log = Log::default();
        let mut rs = AutoCloseCursor::new(tracked("cursor", false, &log))
            .owning(tracked("stmt", false, &log))
            .owning(tracked("conn", false, &log));
        assert!(!rs.advance().unwrap());
        rs.close().unwrap();
        rs.close().unwrap();
        drop(rs);
        assert_eq!(*log.borrow(), vec!["cursor", "stmt", "conn"]);
    }

    #[test]
    fn auto_close_cursor_continues_past_failures() {
        let log = Log::default();
        let mut rs = AutoCloseCursor::new(tracked("cursor", true, &log))
            .owning(tracked("stmt", false, &log));
        let err = rs.close().unwrap_err();
        assert!(matches!(err, SqlError::Driver(ref m) if m == "cursor failed"));
        assert!(rs.is_closed());
        assert_eq!(*log.borrow(), vec!["cursor", "stmt"]);
    }

    #[test]
    fn dropping_auto_close_cursor_closes_it() {
        let log = Log::default();
        {
            let _rs = AutoCloseCursor::new(tracked("cursor", false, &log))
                .owning(tracked("stmt", false, &log));
        }
        assert_eq!(*log.borrow(), vec!["cursor", "stmt"]);
    }
}
