//! Message synchronizer.
//!
//! One flush = one request: the pending queue is snapshotted, stamped
//! with the next epoch and posted to the message endpoint; the response
//! is applied in a fixed order so state merge, reconciliation and
//! listener rebuild cannot interleave. Responses carrying an epoch at or
//! below the last applied one are dropped whole.

use serde_json::Value;
use uni_dom::NodeId;

use crate::component::{InFlight, find_component_root, ns_attr};
use crate::attribute::NAMESPACES;
use crate::element::{ElementModel, PollFacet};
use crate::errors::Error;
use crate::message::{MessageRequest, MessageResponse, ParentFrame, PartialFrame};
use crate::queue::ActionKind;
use crate::runtime::{Effect, Runtime};
use crate::transport::{FilePart, HttpRequest, RequestBody};

impl Runtime {
    /// Snapshot the component's queue and post it to the server.
    ///
    /// No-ops when the queue is empty or when the identical batch is
    /// already on the wire.
    pub fn flush_component(&mut self, component_id: &str) -> Result<(), Error> {
        let Some(comp) = self.registry.get_mut(component_id) else {
            return Err(Error::ComponentNotFound(component_id.to_string()));
        };
        if comp.queue.is_empty() {
            return Ok(());
        }
        if let Some(flight) = &comp.in_flight {
            if flight.generation == comp.queue.generation() {
                tracing::debug!(component = %component_id, "batch already in flight");
                return Ok(());
            }
        }

        let generation = comp.queue.generation();
        let actions = comp.queue.take();
        let epoch = comp.take_epoch();

        // File inputs ride alongside the JSON body as multipart fields.
        let mut files: Vec<FilePart> = Vec::new();
        for action in &actions {
            if action.kind != ActionKind::SyncInput {
                continue;
            }
            let Some(name) = action.payload.get("name").and_then(Value::as_str) else {
                continue;
            };
            for el in &comp.model_els {
                if el.model.as_ref().map(|m| m.name.as_str()) != Some(name) {
                    continue;
                }
                for file in el.files(&self.doc) {
                    files.push(FilePart { field: name.to_string(), file });
                }
            }
        }

        let request = MessageRequest {
            id: comp.id.clone(),
            data: Value::Object(comp.data.clone()),
            checksum: comp.checksum.clone(),
            action_queue: actions.clone(),
            epoch,
            hash: comp.hash.clone(),
        };
        let url = format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            comp.name
        );
        comp.in_flight = Some(InFlight { actions, generation, epoch });

        let body_json = serde_json::to_string(&request)
            .map_err(|e| Error::Protocol(format!("failed to encode request: {e}")))?;
        let body = if files.is_empty() {
            RequestBody::Json(body_json)
        } else {
            RequestBody::Multipart { body: body_json, files }
        };

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
        ];
        if let Some(csrf) = &self.config.csrf {
            headers.push((csrf.header_name.clone(), csrf.token.clone()));
        }

        self.set_loading(component_id, false);

        tracing::debug!(component = %component_id, epoch, "posting message");
        let reply = self.transport.send(&HttpRequest { url, headers, body });

        match reply {
            Err(e) => {
                self.settle(component_id);
                Err(Error::Transport(e))
            }
            // 304: nothing changed server-side; keep current DOM.
            Ok(reply) if reply.status == 304 => {
                self.settle(component_id);
                Ok(())
            }
            Ok(reply) if !reply.is_ok() => {
                self.settle(component_id);
                Err(Error::Protocol(format!(
                    "message endpoint returned {}",
                    reply.status
                )))
            }
            Ok(reply) => match serde_json::from_str::<MessageResponse>(&reply.body) {
                Err(e) => {
                    self.settle(component_id);
                    Err(Error::Protocol(format!("unparseable response: {e}")))
                }
                Ok(response) => self.apply_response(component_id, response),
            },
        }
    }

    /// Apply one server response. Public so embedders (and tests) that
    /// manage their own transport can feed responses back in.
    pub fn apply_response(
        &mut self,
        component_id: &str,
        response: MessageResponse,
    ) -> Result<(), Error> {
        let Some(comp) = self.registry.get(component_id) else {
            return Err(Error::ComponentNotFound(component_id.to_string()));
        };
        // Epochless responses inherit the in-flight epoch; an embedder
        // feeding responses with no flush on record gets the next epoch
        // in order rather than a silent stale-drop.
        let epoch = match (response.epoch, comp.in_flight.as_ref()) {
            (Some(epoch), _) => epoch,
            (None, Some(flight)) => flight.epoch,
            (None, None) => comp.last_applied_epoch + 1,
        };

        // A response for an older request than one already applied is
        // dropped whole; applying it would roll confirmed state back.
        if epoch <= comp.last_applied_epoch {
            tracing::warn!(
                component = %component_id,
                epoch,
                last_applied = comp.last_applied_epoch,
                "dropping stale response"
            );
            self.settle(component_id);
            return Ok(());
        }

        if response.queued {
            tracing::debug!(component = %component_id, "server queued the batch");
            self.settle(component_id);
            return Ok(());
        }

        if let Some(message) = response.error {
            if message.to_ascii_lowercase().contains("checksum") {
                // The server refused the data mirror; rewind visible
                // values to the last confirmed state.
                self.reset_models_to_confirmed(component_id);
            }
            self.settle(component_id);
            return Err(Error::Protocol(message));
        }

        if let Some(redirect) = &response.redirect {
            if let Some(url) = &redirect.url {
                if redirect.refresh {
                    self.effects.push(Effect::PushState {
                        url: url.clone(),
                        title: redirect.title.clone(),
                    });
                } else {
                    // Full navigation: the page is going away, skip the
                    // morph entirely.
                    self.effects.push(Effect::Navigate { url: url.clone() });
                    self.settle(component_id);
                    return Ok(());
                }
            } else if let Some(hash) = &redirect.hash {
                self.effects.push(Effect::SetHash { hash: hash.clone() });
            }
        }

        // Strip rendered validation errors and dirty indicators before
        // the morph sees the tree.
        let els: Vec<ElementModel> = self
            .registry
            .get(component_id)
            .map(|c| c.model_els.clone())
            .unwrap_or_default();
        for el in &els {
            el.remove_errors(&mut self.doc);
            el.apply_dirty(&mut self.doc, true);
        }

        // Confirmed-state merge.
        if let Some(comp) = self.registry.get_mut(component_id) {
            if let Some(data) = response.data {
                for (k, v) in data {
                    comp.data.insert(k, v);
                }
            }
            comp.errors = response.errors.unwrap_or_default();
            comp.last_return = response.return_frame.clone();
            if let Some(checksum) = response.checksum {
                comp.checksum = checksum;
            }
            if let Some(hash) = response.hash {
                comp.hash = hash;
            }
            comp.last_applied_epoch = epoch;

            if let Some(update) = &response.poll {
                let facet = comp.poll.get_or_insert_with(PollFacet::default);
                if let Some(timing) = update.timing {
                    facet.timing_ms = timing;
                }
                if let Some(method) = &update.method {
                    facet.method = method.clone();
                }
                if let Some(disable) = update.disable {
                    facet.disable = disable;
                }
            }
        }
        if response.poll.is_some() {
            self.schedule_poll(component_id);
        }

        // Parent state piggybacks on the child response and applies
        // outermost-last.
        let mut frame = response.parent;
        while let Some(parent) = frame {
            if let Err(e) = self.apply_parent_frame(&parent) {
                self.settle(component_id);
                return Err(e);
            }
            frame = parent.parent.map(|boxed| *boxed);
        }

        // Reconcile: scoped partials when present, else the full root.
        // The in-flight record stays alive until the final model sync,
        // which needs to know what triggered the batch.
        let morph_result = self.morph_response(component_id, &response.partials, &response.dom);
        self.set_loading(component_id, true);
        if let Err(e) = morph_result {
            if let Some(comp) = self.registry.get_mut(component_id) {
                comp.in_flight = None;
                comp.triggering.clear();
            }
            return Err(e);
        }

        if let Some(hooks) = self.hooks.as_mut() {
            hooks.updated(component_id);
        }

        // Every root may have moved; rebuild derived state everywhere.
        for id in self.registry.ids() {
            self.refresh_component(&id);
        }

        if let Some(comp) = self.registry.get_mut(component_id) {
            let suppressed = comp
                .last_return
                .as_ref()
                .is_some_and(|r| r.value == Value::Bool(false));
            comp.visibility_suppressed = suppressed;
            if suppressed {
                comp.visibility_armed.clear();
            }
        }

        self.render_validation_errors(component_id);

        for call in &response.calls {
            self.effects.push(Effect::HostCall {
                function: call.function.clone(),
                args: call.args.clone(),
            });
        }

        self.sync_models_from_data(component_id);
        self.discover();
        Ok(())
    }

    fn morph_response(
        &mut self,
        component_id: &str,
        partials: &[PartialFrame],
        dom: &Option<String>,
    ) -> Result<(), Error> {
        if !partials.is_empty() {
            for partial in partials {
                let Some(target) = self.find_partial_target(component_id, partial) else {
                    tracing::warn!(component = %component_id, "partial target not found");
                    continue;
                };
                self.morpher.morph(&mut self.doc, target, &partial.dom)?;
            }
            return Ok(());
        }
        if let Some(dom) = dom {
            let root = self
                .registry
                .get(component_id)
                .map(|c| c.root)
                .unwrap_or(NodeId::NONE);
            if root.is_valid() {
                self.morpher.morph(&mut self.doc, root, dom)?;
            }
        }
        Ok(())
    }

    /// Resolve a partial frame to a node: key attribute within the
    /// component, then id attribute, each falling back to a
    /// document-wide search. A bare `target` tries both spellings.
    fn find_partial_target(&self, component_id: &str, partial: &PartialFrame) -> Option<NodeId> {
        let root = self.registry.get(component_id).map(|c| c.root)?;

        if let Some(key) = &partial.key {
            return self
                .find_by_key_attr(root, key)
                .or_else(|| self.find_by_key_attr(self.doc.root(), key));
        }
        if let Some(id) = &partial.id {
            return self
                .find_by_id_attr(root, id)
                .or_else(|| self.doc.get_element_by_id(id));
        }
        if let Some(target) = &partial.target {
            return self
                .find_by_key_attr(root, target)
                .or_else(|| self.find_by_key_attr(self.doc.root(), target))
                .or_else(|| self.find_by_id_attr(root, target))
                .or_else(|| self.doc.get_element_by_id(target));
        }
        None
    }

    fn find_by_key_attr(&self, scope: NodeId, name: &str) -> Option<NodeId> {
        self.doc.find_in(scope, |node| {
            node.as_element().is_some_and(|e| {
                NAMESPACES
                    .iter()
                    .any(|ns| e.get_attr(&format!("{ns}key")) == Some(name))
            })
        })
    }

    fn find_by_id_attr(&self, scope: NodeId, name: &str) -> Option<NodeId> {
        self.doc.find_in(scope, |node| {
            node.as_element().is_some_and(|e| e.id.as_deref() == Some(name))
        })
    }

    fn apply_parent_frame(&mut self, frame: &ParentFrame) -> Result<(), Error> {
        let Some(parent_root) = find_component_root(&self.doc, &frame.id) else {
            tracing::warn!(component = %frame.id, "parent frame names an unknown component");
            return Ok(());
        };
        if let Some(comp) = self.registry.get_mut(&frame.id) {
            if let Some(data) = &frame.data {
                for (k, v) in data {
                    comp.data.insert(k.clone(), v.clone());
                }
            }
            if let Some(checksum) = &frame.checksum {
                comp.checksum = checksum.clone();
            }
        }
        if let Some(dom) = &frame.dom {
            self.morpher.morph(&mut self.doc, parent_root, dom)?;
        }
        self.refresh_component(&frame.id);
        Ok(())
    }

    /// Toggle optimistic loading indicators. Targeted indicators only
    /// fire when a triggering element's key or id matches.
    fn set_loading(&mut self, component_id: &str, revert: bool) {
        let Some(comp) = self.registry.get(component_id) else { return };

        if revert {
            let applied = comp.loading_applied.clone();
            let els: Vec<ElementModel> = comp
                .loading_els
                .iter()
                .filter(|el| applied.contains(&el.node))
                .cloned()
                .collect();
            for el in &els {
                el.apply_loading(&mut self.doc, true);
            }
            if let Some(comp) = self.registry.get_mut(component_id) {
                comp.loading_applied.clear();
            }
            return;
        }

        let mut trigger_names: Vec<String> = Vec::new();
        for &node in &comp.triggering {
            if let Some(key) = ns_attr(&self.doc, node, "key") {
                trigger_names.push(key);
            }
            if let Some(id) = self.doc.attr(node, "id") {
                trigger_names.push(id.to_string());
            }
        }
        let els: Vec<ElementModel> = comp
            .loading_els
            .iter()
            .filter(|el| match &el.target {
                None => true,
                Some(target) => trigger_names.iter().any(|n| n == target),
            })
            .cloned()
            .collect();

        let mut applied = Vec::with_capacity(els.len());
        for el in &els {
            el.apply_loading(&mut self.doc, false);
            applied.push(el.node);
        }
        if let Some(comp) = self.registry.get_mut(component_id) {
            comp.loading_applied = applied;
        }
    }

    /// Post-response bookkeeping shared by every exit path: revert
    /// loading, drop the in-flight record, forget triggering elements.
    fn settle(&mut self, component_id: &str) {
        self.set_loading(component_id, true);
        if let Some(comp) = self.registry.get_mut(component_id) {
            comp.in_flight = None;
            comp.triggering.clear();
        }
    }

    /// Rewind every bound element to the last server-confirmed value.
    fn reset_models_to_confirmed(&mut self, component_id: &str) {
        let Some(comp) = self.registry.get(component_id) else { return };
        let data = comp.data.clone();
        let els = comp.model_els.clone();
        for el in &els {
            let Some(model) = &el.model else { continue };
            if let Some(value) = data.get(&model.name) {
                el.set_value(&mut self.doc, value);
            }
        }
    }

    /// Render server validation errors onto their bound elements.
    fn render_validation_errors(&mut self, component_id: &str) {
        let Some(comp) = self.registry.get(component_id) else { return };
        if comp.errors.is_empty() {
            return;
        }
        let errors = comp.errors.clone();
        let els = comp.model_els.clone();
        for el in &els {
            let Some(model) = &el.model else { continue };
            let Some(list) = errors.get(&model.name).and_then(Value::as_array) else {
                continue;
            };
            for entry in list {
                let code = entry.get("code").and_then(Value::as_str).unwrap_or("invalid");
                let message = entry.get("message").and_then(Value::as_str).unwrap_or("");
                el.add_error(&mut self.doc, code, message);
            }
        }
    }

    /// Push confirmed data back into bound elements. The element that
    /// caused the flush keeps its live value unless a method call was in
    /// the batch (a call may rewrite any field).
    fn sync_models_from_data(&mut self, component_id: &str) {
        let (flight, triggering) = match self.registry.get_mut(component_id) {
            Some(comp) => (comp.in_flight.take(), std::mem::take(&mut comp.triggering)),
            None => return,
        };
        let force = flight
            .as_ref()
            .is_some_and(|f| f.actions.iter().any(|a| a.is_call()));

        let Some(comp) = self.registry.get(component_id) else { return };
        let data = comp.data.clone();
        let els = comp.model_els.clone();
        for el in &els {
            let Some(model) = &el.model else { continue };
            if !force && triggering.contains(&el.node) {
                continue;
            }
            if let Some(value) = data.get(&model.name) {
                el.set_value(&mut self.doc, value);
            }
        }
    }
}
