//! Browser entry for the agent console. The page markup owns layout; this
//! crate binds its element ids to a [`manus_console_core::ConsoleController`]
//! and renders each view snapshot back into the DOM.

#[cfg(any(target_arch = "wasm32", test))]
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod bindings;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use gloo_net::http::Request;
    use gloo_timers::callback::{Interval, Timeout};
    use manus_console_core::shortcuts::{KeyChord, composer_submits, global_shortcut};
    use manus_console_core::{
        ApiRequest, Command, ConsoleConfig, ConsoleController, ConsoleView, Effect, HttpMethod,
        InteractionMode, NotificationPhase, PlannedRequest, RequestFailure, RequestOutcome,
        RequestTicket, SettingsView,
    };
    use serde_json::Value;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{
        AbortController, Document, Element, HtmlInputElement, HtmlSelectElement,
        HtmlTextAreaElement, KeyboardEvent,
    };

    use crate::bindings::*;

    type EventHandler = Closure<dyn FnMut(web_sys::Event)>;
    type KeyHandler = Closure<dyn FnMut(KeyboardEvent)>;

    thread_local! {
        static CONTROLLER: RefCell<Option<ConsoleController>> = const { RefCell::new(None) };
        static BASE_URL: RefCell<String> = const { RefCell::new(String::new()) };
        static IN_FLIGHT: RefCell<HashMap<RequestTicket, AbortController>> = RefCell::new(HashMap::new());
        static LAST_VIEW: RefCell<Option<ConsoleView>> = const { RefCell::new(None) };
        static CLICK_HANDLERS: RefCell<Vec<EventHandler>> = const { RefCell::new(Vec::new()) };
        static KEY_HANDLERS: RefCell<Vec<KeyHandler>> = const { RefCell::new(Vec::new()) };
        static PAGE_HANDLERS: RefCell<Vec<EventHandler>> = const { RefCell::new(Vec::new()) };
        static POLL_INTERVAL: RefCell<Option<Interval>> = const { RefCell::new(None) };
        static SWEEP_TIMEOUT: RefCell<Option<Timeout>> = const { RefCell::new(None) };
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        if let Err(error) = boot() {
            web_sys::console::error_1(&JsValue::from_str(&format!("console boot failed: {error}")));
        }
    }

    fn boot() -> Result<(), String> {
        let document = document()?;
        for id in REQUIRED_ELEMENT_IDS {
            if document.get_element_by_id(id).is_none() {
                return Err(format!("missing #{id}"));
            }
        }

        let origin = web_sys::window()
            .ok_or_else(|| "window unavailable".to_string())?
            .location()
            .origin()
            .map_err(|_| "location origin unavailable".to_string())?;
        let config = ConsoleConfig::default()
            .with_backend_base_url(&origin)
            .map_err(|error| error.to_string())?;
        let poll_interval_ms = config.timings.poll_interval_ms;
        BASE_URL.with(|slot| *slot.borrow_mut() = config.backend_base_url.clone());
        populate_agent_select(&document, &config)?;

        let mut controller = ConsoleController::new(config);
        let effects = controller.boot(now_ms());
        CONTROLLER.with(|slot| *slot.borrow_mut() = Some(controller));

        bind_clicks(&document);
        bind_keys(&document)?;
        bind_page_events(&document)?;
        POLL_INTERVAL.with(|slot| {
            let interval = Interval::new(millis_u32(poll_interval_ms), || dispatch(Command::Tick));
            *slot.borrow_mut() = Some(interval);
        });

        web_sys::console::info_1(&JsValue::from_str("agent console booted"));
        run_effects(effects);
        render();
        Ok(())
    }

    fn document() -> Result<Document, String> {
        web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| "document unavailable".to_string())
    }

    fn now_ms() -> u64 {
        js_sys::Date::now().max(0.0) as u64
    }

    fn millis_u32(value: u64) -> u32 {
        u32::try_from(value).unwrap_or(u32::MAX)
    }

    fn dispatch(command: Command) {
        let effects = CONTROLLER.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(|controller| controller.handle(command, now_ms()))
                .unwrap_or_default()
        });
        run_effects(effects);
        render();
    }

    fn run_effects(effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Issue(planned) => issue(planned),
                Effect::ScheduleFollowUpRefresh { delay_ms } => {
                    Timeout::new(millis_u32(delay_ms), || dispatch(Command::FollowUpRefresh))
                        .forget();
                }
            }
        }
    }

    fn issue(planned: PlannedRequest) {
        let PlannedRequest {
            ticket,
            label,
            request,
        } = planned;
        let abort = match AbortController::new() {
            Ok(abort) => abort,
            Err(_) => {
                complete(
                    ticket,
                    Err(RequestFailure::unreachable("AbortController unavailable")),
                );
                return;
            }
        };
        IN_FLIGHT.with(|slot| slot.borrow_mut().insert(ticket, abort.clone()));
        spawn_local(async move {
            let outcome = execute(&request, &abort).await;
            IN_FLIGHT.with(|slot| slot.borrow_mut().remove(&ticket));
            if let Err(failure) = &outcome {
                web_sys::console::warn_1(&JsValue::from_str(&format!(
                    "{label} {ticket} failed: {failure}"
                )));
            }
            complete(ticket, outcome);
        });
    }

    fn complete(ticket: RequestTicket, outcome: RequestOutcome<Value>) {
        let effects = CONTROLLER.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(|controller| controller.complete(ticket, outcome, now_ms()))
                .unwrap_or_default()
        });
        run_effects(effects);
        render();
    }

    /// Fetches one request under its deadline. The deadline aborts the
    /// fetch; any other abort comes from [`cancel_all`].
    async fn execute(request: &ApiRequest, abort: &AbortController) -> RequestOutcome<Value> {
        let url = BASE_URL.with(|slot| format!("{}{}", slot.borrow(), request.path));
        let deadline_fired = Rc::new(Cell::new(false));
        let deadline = {
            let deadline_fired = Rc::clone(&deadline_fired);
            let abort = abort.clone();
            Timeout::new(millis_u32(request.timeout_ms), move || {
                deadline_fired.set(true);
                abort.abort();
            })
        };

        let signal = abort.signal();
        let builder = match request.method {
            HttpMethod::Get => Request::get(&url),
            HttpMethod::Post => Request::post(&url).header("content-type", "application/json"),
        }
        .abort_signal(Some(&signal));
        let built = match &request.body {
            Some(body) => builder.body(body.to_string()),
            None => builder.build(),
        };
        let result = match built {
            Ok(prepared) => prepared.send().await,
            Err(error) => Err(error),
        };

        let outcome = match result {
            Ok(response) => match response.text().await {
                Ok(body) => decode_response(response.status(), &body),
                Err(error) => Err(fetch_failure(error, deadline_fired.get())),
            },
            Err(error) => Err(fetch_failure(error, deadline_fired.get())),
        };
        drop(deadline);
        outcome
    }

    fn fetch_failure(error: gloo_net::Error, deadline_fired: bool) -> RequestFailure {
        match error {
            gloo_net::Error::JsError(js) => {
                classify_fetch_error(&js.name, &js.message, deadline_fired)
            }
            gloo_net::Error::SerdeError(error) => RequestFailure::malformed(error.to_string()),
            gloo_net::Error::GlooError(message) => RequestFailure::unreachable(message),
        }
    }

    fn cancel_all() {
        let pending: Vec<AbortController> =
            IN_FLIGHT.with(|slot| slot.borrow_mut().drain().map(|(_, abort)| abort).collect());
        for abort in pending {
            abort.abort();
        }
    }

    fn populate_agent_select(document: &Document, config: &ConsoleConfig) -> Result<(), String> {
        let Some(select) = document.get_element_by_id(AGENT_SELECT_ID) else {
            return Ok(());
        };
        if select.child_element_count() > 0 {
            return Ok(());
        }
        for agent_type in &config.agent_types {
            let option = document
                .create_element("option")
                .map_err(|_| "failed to create agent option".to_string())?;
            option
                .set_attribute("value", agent_type)
                .map_err(|_| "failed to set agent option value".to_string())?;
            option.set_text_content(Some(agent_type));
            if agent_type == &config.default_agent_type {
                let _ = option.set_attribute("selected", "");
            }
            let _ = select.append_child(&option);
        }
        Ok(())
    }

    fn bind_clicks(document: &Document) {
        CLICK_HANDLERS.with(|slot| {
            let mut handlers = slot.borrow_mut();
            if !handlers.is_empty() {
                return;
            }
            for id in CLICK_TARGETS {
                let (Some(element), Some(intent)) =
                    (document.get_element_by_id(id), button_intent(id))
                else {
                    continue;
                };
                let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(
                    move |_event: web_sys::Event| apply_intent(intent.clone()),
                ));
                let _ = element
                    .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
                handlers.push(callback);
            }
        });
    }

    fn apply_intent(intent: ButtonIntent) {
        match intent {
            ButtonIntent::Dispatch(command) => dispatch(command),
            ButtonIntent::SendComposer => send_composer(),
            ButtonIntent::StartSelectedAgent => dispatch(Command::StartAgent {
                agent_type: selected_agent_type(),
            }),
            ButtonIntent::SaveEditedKeys => save_edited_keys(),
        }
    }

    fn selected_agent_type() -> Option<String> {
        document()
            .ok()?
            .get_element_by_id(AGENT_SELECT_ID)?
            .dyn_into::<HtmlSelectElement>()
            .ok()
            .map(|select| select.value())
            .filter(|value| !value.is_empty())
    }

    fn composer() -> Option<HtmlTextAreaElement> {
        document()
            .ok()?
            .get_element_by_id(CHAT_TEXTAREA_ID)?
            .dyn_into::<HtmlTextAreaElement>()
            .ok()
    }

    fn send_composer() {
        let Some(textarea) = composer() else {
            return;
        };
        let text = textarea.value();
        let sending = CONTROLLER.with(|slot| {
            slot.borrow()
                .as_ref()
                .is_some_and(|controller| controller.busy().sending_chat)
        });
        if text.trim().is_empty() || sending {
            return;
        }
        textarea.set_value("");
        dispatch(Command::SendChat(text));
        let _ = textarea.focus();
    }

    fn save_edited_keys() {
        let Ok(document) = document() else {
            return;
        };
        let names: Vec<String> = CONTROLLER.with(|slot| {
            slot.borrow()
                .as_ref()
                .map(|controller| {
                    controller
                        .settings()
                        .entries()
                        .into_iter()
                        .map(|entry| entry.name)
                        .collect()
                })
                .unwrap_or_default()
        });
        for name in names {
            let Some(input) = document
                .get_element_by_id(&key_input_id(&name))
                .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
            else {
                continue;
            };
            dispatch(Command::SetSetting {
                name,
                value: input.value(),
            });
        }
        dispatch(Command::SaveSettings);
    }

    fn bind_keys(document: &Document) -> Result<(), String> {
        let textarea = document
            .get_element_by_id(CHAT_TEXTAREA_ID)
            .ok_or_else(|| "missing chat textarea".to_string())?;
        KEY_HANDLERS.with(|slot| {
            let mut handlers = slot.borrow_mut();
            if !handlers.is_empty() {
                return;
            }

            let composer_keys = Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(
                move |event: KeyboardEvent| {
                    let key = event.key();
                    let chord = KeyChord {
                        key: &key,
                        ctrl: event.ctrl_key(),
                        meta: event.meta_key(),
                        shift: event.shift_key(),
                    };
                    if composer_submits(chord) {
                        event.prevent_default();
                        send_composer();
                    }
                },
            ));
            let _ = textarea
                .add_event_listener_with_callback("keydown", composer_keys.as_ref().unchecked_ref());
            handlers.push(composer_keys);

            let global_keys = Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(
                move |event: KeyboardEvent| {
                    let key = event.key();
                    let chord = KeyChord {
                        key: &key,
                        ctrl: event.ctrl_key(),
                        meta: event.meta_key(),
                        shift: event.shift_key(),
                    };
                    let active = CONTROLLER.with(|slot| {
                        slot.borrow()
                            .as_ref()
                            .map_or(InteractionMode::default(), ConsoleController::mode)
                    });
                    if let Some(command) = global_shortcut(chord, active) {
                        event.prevent_default();
                        dispatch(command);
                    }
                },
            ));
            let _ = document
                .add_event_listener_with_callback("keydown", global_keys.as_ref().unchecked_ref());
            handlers.push(global_keys);
        });
        Ok(())
    }

    fn bind_page_events(document: &Document) -> Result<(), String> {
        let window = web_sys::window().ok_or_else(|| "window unavailable".to_string())?;
        let agent_select = document.get_element_by_id(AGENT_SELECT_ID);
        PAGE_HANDLERS.with(|slot| {
            let mut handlers = slot.borrow_mut();
            if !handlers.is_empty() {
                return;
            }

            let visibility = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(
                move |_event: web_sys::Event| {
                    let visible = document().is_ok_and(|document| !document.hidden());
                    dispatch(Command::VisibilityChanged { visible });
                },
            ));
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                visibility.as_ref().unchecked_ref(),
            );
            handlers.push(visibility);

            let page_hide = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(
                move |_event: web_sys::Event| {
                    POLL_INTERVAL.with(|slot| slot.borrow_mut().take());
                    cancel_all();
                },
            ));
            let _ = window
                .add_event_listener_with_callback("pagehide", page_hide.as_ref().unchecked_ref());
            handlers.push(page_hide);

            if let Some(select) = agent_select {
                let change = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(
                    move |_event: web_sys::Event| {
                        if let Some(selected) = selected_agent_type() {
                            dispatch(Command::SelectAgentType(selected));
                        }
                    },
                ));
                let _ = select
                    .add_event_listener_with_callback("change", change.as_ref().unchecked_ref());
                handlers.push(change);
            }
        });
        Ok(())
    }

    fn render() {
        let Some(view) = CONTROLLER.with(|slot| slot.borrow().as_ref().map(ConsoleController::view))
        else {
            return;
        };
        let Ok(document) = document() else {
            return;
        };
        let previous = LAST_VIEW.with(|slot| slot.borrow_mut().replace(view.clone()));
        let changed = |pick: &dyn Fn(&ConsoleView) -> bool| {
            previous.as_ref().is_none_or(|previous| pick(previous))
        };

        if changed(&|previous| previous.mode != view.mode) {
            render_mode(&document, view.mode);
        }
        if changed(&|previous| previous.log_pane_text != view.log_pane_text) {
            render_logs(&document, &view);
        }
        if changed(&|previous| previous.logs_last_refreshed_at_ms != view.logs_last_refreshed_at_ms)
        {
            render_refresh_title(&document, view.logs_last_refreshed_at_ms);
        }
        if changed(&|previous| previous.turns != view.turns) {
            render_turns(&document, &view);
        }
        if changed(&|previous| {
            previous.settings_entries != view.settings_entries
                || previous.settings_view != view.settings_view
                || previous.settings_error != view.settings_error
        }) {
            render_settings(&document, &view);
        }
        if changed(&|previous| previous.notification != view.notification) {
            render_notification(&document, &view);
        }
        if changed(&|previous| previous.busy != view.busy) {
            for button in busy_buttons(view.busy) {
                let Some(element) = document.get_element_by_id(button.id) else {
                    continue;
                };
                element.set_text_content(Some(button.label));
                let _ = if button.disabled {
                    element.set_attribute("disabled", "")
                } else {
                    element.remove_attribute("disabled")
                };
            }
        }
        schedule_sweep();
    }

    fn render_mode(document: &Document, active: InteractionMode) {
        for mode in InteractionMode::ALL {
            let on = mode == active;
            if let Some(button) = document.get_element_by_id(mode_button_id(mode)) {
                let _ = button.class_list().toggle_with_force(ACTIVE_CLASS, on);
            }
            if let Some(section) = document.get_element_by_id(&mode_section_id(mode)) {
                let _ = section.class_list().toggle_with_force(ACTIVE_CLASS, on);
            }
        }
    }

    fn render_logs(document: &Document, view: &ConsoleView) {
        let Some(pane) = document.get_element_by_id(AGENT_LOGS_ID) else {
            return;
        };
        pane.set_text_content(Some(&view.log_pane_text));
        pane.set_scroll_top(pane.scroll_height());
    }

    fn render_refresh_title(document: &Document, refreshed_at_ms: Option<u64>) {
        let (Some(button), Some(at_ms)) =
            (document.get_element_by_id(REFRESH_LOGS_BUTTON_ID), refreshed_at_ms)
        else {
            return;
        };
        let time = String::from(
            js_sys::Date::new(&JsValue::from_f64(at_ms as f64)).to_locale_time_string("default"),
        );
        let _ = button.set_attribute("title", &format!("Last refreshed: {time}"));
    }

    fn render_turns(document: &Document, view: &ConsoleView) {
        let Some(history) = document.get_element_by_id(CHAT_HISTORY_ID) else {
            return;
        };
        history.set_inner_html("");
        for turn in &view.turns {
            let (Ok(entry), Ok(message)) =
                (document.create_element("div"), document.create_element("div"))
            else {
                continue;
            };
            entry.set_class_name(CHAT_ENTRY_CLASS);
            message.set_class_name(turn_class(turn.role, turn.failed));
            message.set_id(&turn.id.to_string());
            message.set_text_content(Some(&turn.content));
            let _ = entry.append_child(&message);
            let _ = history.append_child(&entry);
        }
        history.set_scroll_top(history.scroll_height());
    }

    fn render_settings(document: &Document, view: &ConsoleView) {
        let Some(list) = document.get_element_by_id(SETTINGS_LIST_ID) else {
            return;
        };
        list.set_inner_html("");
        for entry in &view.settings_entries {
            let Ok(row) = document.create_element("div") else {
                continue;
            };
            row.set_class_name("setting-row");
            let _ = append_text(document, &row, "label", &entry.name);
            match view.settings_view {
                SettingsView::ReadOnly => {
                    let _ = append_text(document, &row, "span", &entry.display);
                }
                SettingsView::Editing => {
                    if let Some(input) = document
                        .create_element("input")
                        .ok()
                        .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
                    {
                        input.set_class_name(KEY_INPUT_CLASS);
                        input.set_id(&key_input_id(&entry.name));
                        let _ = input.set_attribute(KEY_NAME_ATTRIBUTE, &entry.name);
                        input.set_value(&entry.display);
                        let _ = row.append_child(&input);
                    }
                }
            }
            let _ = list.append_child(&row);
        }
        if let Some(error) = &view.settings_error {
            if let Ok(row) = document.create_element("div") {
                row.set_class_name("settings-error");
                row.set_text_content(Some(error));
                let _ = list.append_child(&row);
            }
        }
    }

    fn append_text(document: &Document, parent: &Element, tag: &str, text: &str) -> Result<(), JsValue> {
        let element = document.create_element(tag)?;
        element.set_text_content(Some(text));
        parent.append_child(&element)?;
        Ok(())
    }

    fn render_notification(document: &Document, view: &ConsoleView) {
        if let Ok(Some(existing)) = document.query_selector(&format!(".{NOTIFICATION_CLASS}")) {
            existing.remove();
        }
        let (Some(notification), Some(body)) = (&view.notification, document.body()) else {
            return;
        };
        let Ok(element) = document.create_element("div") else {
            return;
        };
        let mut class = notification_class(notification.severity);
        if notification.phase == NotificationPhase::FadingOut {
            class.push_str(" fading");
        }
        element.set_class_name(&class);
        element.set_text_content(Some(&notification.text));
        let _ = body.append_child(&element);
    }

    fn schedule_sweep() {
        let deadline = CONTROLLER.with(|slot| {
            slot.borrow()
                .as_ref()
                .and_then(ConsoleController::next_notification_deadline_ms)
        });
        let timeout = deadline.map(|deadline_ms| {
            let delay_ms = deadline_ms.saturating_sub(now_ms());
            Timeout::new(millis_u32(delay_ms), || {
                // The running timer must not be dropped from inside its own callback.
                SWEEP_TIMEOUT.with(|slot| slot.borrow_mut().take().map(Timeout::forget));
                let changed = CONTROLLER.with(|slot| {
                    slot.borrow_mut()
                        .as_mut()
                        .is_some_and(|controller| controller.sweep_notifications(now_ms()))
                });
                if changed {
                    render();
                } else {
                    schedule_sweep();
                }
            })
        });
        // Replacing the slot cancels the previous timer.
        SWEEP_TIMEOUT.with(|slot| *slot.borrow_mut() = timeout);
    }
}
