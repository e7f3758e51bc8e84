//! The dashboard controller: maps the fixed route table onto the
//! application's display snapshots and action callbacks.

mod html;
mod routes;
mod views;

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use http::{Method, StatusCode};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::ApConfig;
use crate::portal::{Request, RequestRx, Response, Transport, REQUEST_QUEUE};

pub use html::INDEX_HTML;
pub use routes::Route;
pub use views::{
    Output, OutputDisplay, OutputState, SensorDisplay, SensorReading, SystemDisplay, Views,
};

/// Delay between acknowledging `/api/reset` and rebooting.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

const STATUS_BUF_CAPACITY: usize = 512;
const CUSTOM_ACTION_MESSAGE: &str = "Custom action completed";

type OutputCallback = Box<dyn FnMut(bool)>;
type ModeCallback = Box<dyn FnMut(&str)>;
type ActionCallback = Box<dyn FnMut()>;

#[derive(Default)]
struct Slots {
    outputs: [Option<OutputCallback>; 2],
    mode: Option<ModeCallback>,
    reset: Option<ActionCallback>,
    custom: Option<ActionCallback>,
}

#[derive(Serialize)]
struct Ack {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

/// What a handled request produced, plus whether the device must reboot once
/// the response is out.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub response: Response,
    pub restart_after: Option<Duration>,
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self {
            response,
            restart_after: None,
        }
    }
}

pub struct Dashboard<T: Transport> {
    config: ApConfig,
    transport: T,
    slots: Slots,
    requests: Option<RequestRx>,
    buf: BytesMut,
}

impl<T: Transport> Dashboard<T> {
    pub fn attach(ssid: impl Into<String>, pass: impl Into<String>, transport: T) -> Self {
        Self::with_config(ApConfig::new(ssid, pass), transport)
    }

    pub fn with_config(config: ApConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            slots: Slots::default(),
            requests: None,
            buf: BytesMut::with_capacity(STATUS_BUF_CAPACITY),
        }
    }

    pub fn config(&self) -> &ApConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_started(&self) -> bool {
        self.requests.is_some()
    }

    pub fn url(&self) -> String {
        self.transport.url()
    }

    /// Brings up the access point and starts accepting requests. Requests are
    /// only answered from [`Dashboard::poll`].
    pub fn start(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.is_started(), "dashboard already started");
        self.config.validate()?;

        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        self.transport.serve(&self.config, &Route::PATHS, tx)?;
        self.requests = Some(rx);

        log::info!("Dashboard started: {} at {}", self.config.ssid, self.url());
        Ok(())
    }

    /// Answers the requests already waiting when called, against `views`, on
    /// the caller's thread. Requests that arrive meanwhile wait for the next
    /// call. Returns how many were handled.
    ///
    /// A reset request blocks here for [`RESTART_DELAY`] and then restarts
    /// through the transport.
    pub fn poll(&mut self, views: &Views<'_>) -> usize {
        let Some(requests) = self.requests.as_ref() else {
            return 0;
        };
        if requests.is_closed() && requests.is_empty() {
            log::error!("HTTP transport stopped forwarding requests");
            self.requests = None;
            return 0;
        }
        let pending_now = requests.len();

        let mut handled = 0;
        while handled < pending_now {
            let Some(pending) = self.requests.as_mut().and_then(|rx| rx.try_recv().ok()) else {
                break;
            };

            let reply = self.handle(&pending.request, views);
            pending.respond(reply.response);
            handled += 1;

            if let Some(delay) = reply.restart_after {
                log::warn!("Restarting in {:?}", delay);
                std::thread::sleep(delay);
                self.transport.restart();
            }
        }
        handled
    }

    pub fn handle(&mut self, request: &Request, views: &Views<'_>) -> Reply {
        let Some(route) = Route::from_path(request.path()) else {
            log::debug!("no route for {}", request.path());
            return Response::not_found().into();
        };
        if *request.method() != Method::GET {
            log::warn!("{} {} rejected", request.method(), request.path());
            return Response::method_not_allowed().into();
        }
        log::debug!("GET {:?}", route);

        match route {
            Route::Index => Response::html(INDEX_HTML).into(),
            Route::Status => self.status(views).into(),
            Route::Output(output) => {
                let (Some(state), Some(callback)) = (
                    request.arg("state"),
                    self.slots.outputs[output.index()].as_mut(),
                ) else {
                    log::warn!("Rejected {}: missing state or no handler", route.path());
                    return Response::invalid_request().into();
                };
                let on = state == "1";
                log::info!("Output {:?} -> {}", output, on);
                callback(on);
                self.ack(None).into()
            }
            Route::Mode => {
                let (Some(mode), Some(callback)) = (request.arg("mode"), self.slots.mode.as_mut())
                else {
                    log::warn!("Rejected {}: missing mode or no handler", route.path());
                    return Response::invalid_request().into();
                };
                log::info!("Mode -> {:?}", mode);
                callback(mode.as_str());
                self.ack(None).into()
            }
            // reset and custom report success whether or not a handler ran
            Route::Reset => {
                log::info!("Reset requested");
                if let Some(callback) = self.slots.reset.as_mut() {
                    callback();
                }
                Reply {
                    response: self.ack(None),
                    restart_after: Some(RESTART_DELAY),
                }
            }
            Route::Custom => {
                log::info!("Custom action requested");
                if let Some(callback) = self.slots.custom.as_mut() {
                    callback();
                }
                self.ack(Some(CUSTOM_ACTION_MESSAGE)).into()
            }
        }
    }

    pub fn on_output_changed(&mut self, output: Output, callback: impl FnMut(bool) + 'static) {
        self.slots.outputs[output.index()] = Some(Box::new(callback));
    }

    pub fn on_mode_changed(&mut self, callback: impl FnMut(&str) + 'static) {
        self.slots.mode = Some(Box::new(callback));
    }

    pub fn on_reset_requested(&mut self, callback: impl FnMut() + 'static) {
        self.slots.reset = Some(Box::new(callback));
    }

    pub fn on_custom_action(&mut self, callback: impl FnMut() + 'static) {
        self.slots.custom = Some(Box::new(callback));
    }

    fn status(&mut self, views: &Views<'_>) -> Response {
        match views.write_status((&mut self.buf).writer()) {
            Ok(()) => Response::json(StatusCode::OK, self.take_buf()),
            Err(e) => {
                log::error!("Failed to serialize status: {:?}", e);
                self.buf.clear();
                Response::internal_error()
            }
        }
    }

    fn ack(&mut self, message: Option<&'static str>) -> Response {
        let ack = Ack {
            success: true,
            message,
        };
        match serde_json::to_writer((&mut self.buf).writer(), &ack) {
            Ok(()) => Response::json(StatusCode::OK, self.take_buf()),
            Err(e) => {
                log::error!("Failed to serialize ack: {:?}", e);
                self.buf.clear();
                Response::internal_error()
            }
        }
    }

    /// Hands the serialized bytes out and gets the buffer ready for the next
    /// document; the allocation is reused once the previous response is gone.
    fn take_buf(&mut self) -> Bytes {
        let body = self.buf.split().freeze();
        self.buf.reserve(STATUS_BUF_CAPACITY);
        body
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::portal::{PendingRequest, RequestTx};

    #[derive(Default)]
    struct Loopback {
        requests: Option<RequestTx>,
        paths: Vec<&'static str>,
        restarts: Rc<Cell<usize>>,
    }

    impl Transport for Loopback {
        fn serve(
            &mut self,
            _config: &ApConfig,
            paths: &[&'static str],
            requests: RequestTx,
        ) -> anyhow::Result<()> {
            self.paths = paths.to_vec();
            self.requests = Some(requests);
            Ok(())
        }

        fn url(&self) -> String {
            "http://loopback".to_string()
        }

        fn restart(&mut self) {
            self.restarts.set(self.restarts.get() + 1);
        }
    }

    fn dashboard() -> Dashboard<Loopback> {
        Dashboard::attach("Greenhouse", "12345678", Loopback::default())
    }

    fn get(dashboard: &mut Dashboard<Loopback>, target: &str) -> Reply {
        dashboard.handle(&Request::get(target).unwrap(), &Views::new())
    }

    fn body(reply: &Reply) -> &str {
        std::str::from_utf8(&reply.response.body).unwrap()
    }

    #[test]
    fn test_index_serves_page() {
        let mut d = dashboard();
        let reply = get(&mut d, "/");
        assert_eq!(reply.response.status, StatusCode::OK);
        assert_eq!(reply.response.content_type, "text/html");
        assert!(body(&reply).contains("/api/status"));
    }

    #[test]
    fn test_status_with_views() {
        let mut d = dashboard();
        let system = SystemDisplay::new("Greenhouse", "v1.0");
        let views = Views::new().with_system(&system);
        let reply = d.handle(&Request::get("/api/status").unwrap(), &views);
        assert_eq!(reply.response.content_type, "application/json");
        assert_eq!(
            body(&reply),
            r#"{"system":{"name":"Greenhouse","version":"v1.0","mode":"auto","uptime":0}}"#
        );

        let reply = get(&mut d, "/api/status");
        assert_eq!(body(&reply), "{}");
    }

    #[test]
    fn test_output_callback_fires_once() {
        let mut d = dashboard();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = calls.clone();
        d.on_output_changed(Output::One, move |on| c.borrow_mut().push(on));

        let reply = get(&mut d, "/api/output1?state=1");
        assert_eq!(reply.response.status, StatusCode::OK);
        assert_eq!(body(&reply), r#"{"success":true}"#);
        assert_eq!(*calls.borrow(), vec![true]);

        // anything other than "1" switches off
        get(&mut d, "/api/output1?state=on");
        assert_eq!(*calls.borrow(), vec![true, false]);
    }

    #[test]
    fn test_output_without_state_is_rejected() {
        let mut d = dashboard();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        d.on_output_changed(Output::One, move |_| c.set(c.get() + 1));

        let reply = get(&mut d, "/api/output1");
        assert_eq!(reply.response.status, StatusCode::BAD_REQUEST);
        assert_eq!(body(&reply), r#"{"error":"Invalid request"}"#);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_output_bare_state_key_is_rejected() {
        let mut d = dashboard();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = calls.clone();
        d.on_output_changed(Output::One, move |on| c.borrow_mut().push(on));

        let reply = get(&mut d, "/api/output1?state");
        assert_eq!(reply.response.status, StatusCode::BAD_REQUEST);
        assert_eq!(body(&reply), r#"{"error":"Invalid request"}"#);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_output_without_handler_is_rejected() {
        let mut d = dashboard();
        d.on_output_changed(Output::One, |_| {});
        let reply = get(&mut d, "/api/output2?state=1");
        assert_eq!(reply.response.status, StatusCode::BAD_REQUEST);
        assert_eq!(body(&reply), r#"{"error":"Invalid request"}"#);
    }

    #[test]
    fn test_outputs_have_separate_slots() {
        let mut d = dashboard();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for output in Output::ALL {
            let s = seen.clone();
            d.on_output_changed(output, move |on| s.borrow_mut().push((output, on)));
        }
        get(&mut d, "/api/output2?state=1");
        get(&mut d, "/api/output1?state=0");
        assert_eq!(
            *seen.borrow(),
            vec![(Output::Two, true), (Output::One, false)]
        );
    }

    #[test]
    fn test_mode_is_passed_through_unvalidated() {
        let mut d = dashboard();
        let modes = Rc::new(RefCell::new(Vec::new()));
        let m = modes.clone();
        d.on_mode_changed(move |mode| m.borrow_mut().push(mode.to_string()));

        let reply = get(&mut d, "/api/mode?mode=sleep");
        assert_eq!(body(&reply), r#"{"success":true}"#);
        get(&mut d, "/api/mode?mode=turbo+boost");
        assert_eq!(*modes.borrow(), vec!["sleep", "turbo boost"]);

        let reply = get(&mut d, "/api/mode");
        assert_eq!(reply.response.status, StatusCode::BAD_REQUEST);
        assert_eq!(modes.borrow().len(), 2);
    }

    #[test]
    fn test_mode_without_handler_is_rejected() {
        let mut d = dashboard();
        let reply = get(&mut d, "/api/mode?mode=auto");
        assert_eq!(reply.response.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_reregistering_replaces_slot() {
        let mut d = dashboard();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let f = first.clone();
        d.on_custom_action(move || f.set(f.get() + 1));
        let s = second.clone();
        d.on_custom_action(move || s.set(s.get() + 1));

        get(&mut d, "/api/custom");
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_reset_always_succeeds_and_restarts() {
        let mut d = dashboard();
        let reply = get(&mut d, "/api/reset");
        assert_eq!(body(&reply), r#"{"success":true}"#);
        assert_eq!(reply.restart_after, Some(RESTART_DELAY));

        let called = Rc::new(Cell::new(false));
        let c = called.clone();
        d.on_reset_requested(move || c.set(true));
        let reply = get(&mut d, "/api/reset");
        assert!(called.get());
        assert_eq!(reply.restart_after, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_custom_always_succeeds() {
        let mut d = dashboard();
        let reply = get(&mut d, "/api/custom");
        assert_eq!(reply.response.status, StatusCode::OK);
        assert_eq!(
            body(&reply),
            r#"{"success":true,"message":"Custom action completed"}"#
        );
        assert_eq!(reply.restart_after, None);
    }

    #[test]
    fn test_unknown_route_and_method() {
        let mut d = dashboard();
        let reply = get(&mut d, "/api/output3?state=1");
        assert_eq!(reply.response.status, StatusCode::NOT_FOUND);

        let post = Request::new(Method::POST, "/api/status".parse().unwrap());
        let reply = d.handle(&post, &Views::new());
        assert_eq!(reply.response.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_start_binds_route_table_once() {
        let mut d = dashboard();
        assert!(!d.is_started());
        d.start().unwrap();
        assert!(d.is_started());
        assert_eq!(d.transport().paths, Route::PATHS.to_vec());
        assert!(d.start().is_err());
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let mut d = Dashboard::attach("Greenhouse", "short", Loopback::default());
        assert!(d.start().is_err());
        assert!(!d.is_started());
    }

    #[test]
    fn test_poll_before_start_is_noop() {
        let mut d = dashboard();
        assert_eq!(d.poll(&Views::new()), 0);
    }

    #[test]
    fn test_poll_answers_queued_requests() {
        let mut d = dashboard();
        d.start().unwrap();
        let tx = d.transport().requests.clone().unwrap();

        let outputs = Rc::new(RefCell::new(OutputDisplay {
            outputs: [OutputState::new("LED"), OutputState::new("Relay")],
        }));
        let o = outputs.clone();
        d.on_output_changed(Output::Two, move |on| o.borrow_mut().set(Output::Two, on));

        let (pending, mut toggle) = PendingRequest::new(Request::get("/api/output2?state=1").unwrap());
        tx.try_send(pending).unwrap();
        assert_eq!(d.poll(&Views::new()), 1);
        assert_eq!(toggle.try_recv().unwrap().status, StatusCode::OK);
        assert!(outputs.borrow().get(Output::Two).on);

        let snapshot = outputs.borrow().clone();
        let views = Views::new().with_outputs(&snapshot);
        let (pending, mut status) = PendingRequest::new(Request::get("/api/status").unwrap());
        tx.try_send(pending).unwrap();
        assert_eq!(d.poll(&views), 1);
        let resp = status.try_recv().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(v["outputs"]["output2"], true);
        assert_eq!(v["outputs"]["label2"], "Relay");

        assert_eq!(d.poll(&views), 0);
    }

    #[test]
    fn test_poll_leaves_late_requests_for_next_call() {
        let mut d = dashboard();
        d.start().unwrap();
        let tx = d.transport().requests.clone().unwrap();

        // every custom action queues another one behind it
        let replies = Rc::new(RefCell::new(Vec::new()));
        let r = replies.clone();
        let requeue = tx.clone();
        d.on_custom_action(move || {
            let (pending, reply) = PendingRequest::new(Request::get("/api/custom").unwrap());
            requeue.try_send(pending).unwrap();
            r.borrow_mut().push(reply);
        });

        let (pending, mut first) = PendingRequest::new(Request::get("/api/custom").unwrap());
        tx.try_send(pending).unwrap();
        assert_eq!(d.poll(&Views::new()), 1);
        assert_eq!(first.try_recv().unwrap().status, StatusCode::OK);
        assert_eq!(replies.borrow().len(), 1);

        assert_eq!(d.poll(&Views::new()), 1);
        assert_eq!(replies.borrow_mut()[0].try_recv().unwrap().status, StatusCode::OK);
        assert_eq!(replies.borrow().len(), 2);
    }

    #[test]
    fn test_poll_restarts_after_reset() {
        let mut d = dashboard();
        let restarts = d.transport().restarts.clone();
        d.start().unwrap();
        let tx = d.transport().requests.clone().unwrap();

        let (pending, mut reply) = PendingRequest::new(Request::get("/api/reset").unwrap());
        tx.try_send(pending).unwrap();
        assert_eq!(d.poll(&Views::new()), 1);
        assert_eq!(&reply.try_recv().unwrap().body[..], br#"{"success":true}"#);
        assert_eq!(restarts.get(), 1);
    }

    #[test]
    fn test_poll_survives_transport_shutdown() {
        let mut d = dashboard();
        d.start().unwrap();
        d.transport.requests = None;
        assert_eq!(d.poll(&Views::new()), 0);
        assert!(!d.is_started());
    }

    #[test]
    fn test_status_buffer_is_reused() {
        let mut d = dashboard();
        let system = SystemDisplay::new("Greenhouse", "v1.0");
        let views = Views::new().with_system(&system);
        let first = d.handle(&Request::get("/api/status").unwrap(), &views);
        let second = d.handle(&Request::get("/api/status").unwrap(), &views);
        assert_eq!(first.response.body, second.response.body);
        assert!(d.buf.is_empty());
    }
}
