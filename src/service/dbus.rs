//! Bus transport
//!
//! Incoming `org.gnome.Shell.SearchProvider2` calls are read straight off
//! the connection's message stream instead of being registered per object,
//! so one handler can answer the base path and every channel node beneath
//! it. The daemon is reached through a generated proxy.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, trace, warn};
use tokio_util::sync::CancellationToken;
use zbus::{
    dbus_proxy,
    zvariant::{OwnedValue, Value},
    Connection, ConnectionBuilder, Message, MessageStream, MessageType,
};

use crate::{
    config::{self, BusType, Config},
    core::{
        error::{ProviderError, ProviderResult},
        meta::ResultMeta,
        traits::{Launcher, SearchBackend},
    },
    orchestration::router::ObjectRouter,
    service::provider::{MethodCall, MethodReply, SearchProviderService},
};

pub const SEARCH_PROVIDER_INTERFACE: &str = "org.gnome.Shell.SearchProvider2";
const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";
const PROVIDER_ERROR_PREFIX: &str = "org.learningequality.Kolibri.SearchProvider.Error";

#[dbus_proxy(
    interface = "org.learningequality.Kolibri.Daemon",
    default_service = "org.learningequality.Kolibri.Daemon",
    default_path = "/org/learningequality/Kolibri/Daemon",
    gen_blocking = false
)]
trait Daemon {
    fn get_item_ids_for_search(&self, search: &str) -> zbus::Result<Vec<String>>;

    fn get_metadata_for_item_ids(
        &self,
        item_ids: &[&str],
    ) -> zbus::Result<Vec<HashMap<String, OwnedValue>>>;
}

fn bus_error(context: &str, err: zbus::Error) -> ProviderError {
    ProviderError::Internal(format!("{context}: {err}"))
}

/// [`SearchBackend`] backed by the content daemon on the bus
pub struct DaemonBackend {
    proxy: DaemonProxy<'static>,
}

impl DaemonBackend {
    pub async fn connect(connection: &Connection, config: &config::Daemon) -> ProviderResult<Self> {
        let proxy = DaemonProxy::builder(connection)
            .destination(config.bus_name.clone())
            .map_err(|e| bus_error("Invalid daemon bus name", e))?
            .path(config.object_path.clone())
            .map_err(|e| bus_error("Invalid daemon object path", e))?
            .build()
            .await
            .map_err(|e| bus_error("Error creating Kolibri daemon proxy", e))?;

        Ok(Self { proxy })
    }
}

#[async_trait]
impl SearchBackend for DaemonBackend {
    async fn get_item_ids_for_search(
        &self,
        query: &str,
        cancellation: CancellationToken,
    ) -> ProviderResult<Vec<String>> {
        tokio::select! {
            _ = cancellation.cancelled() => Err(ProviderError::Cancelled),
            result = self.proxy.get_item_ids_for_search(query) => {
                result.map_err(|e| ProviderError::Backend(e.to_string()))
            }
        }
    }

    async fn get_metadata_for_item_ids(
        &self,
        item_ids: &[String],
    ) -> ProviderResult<Vec<ResultMeta>> {
        let item_ids: Vec<&str> = item_ids.iter().map(String::as_str).collect();
        let metas = self
            .proxy
            .get_metadata_for_item_ids(&item_ids)
            .await
            .map_err(|e| ProviderError::Backend(e.to_string()))?;

        metas.into_iter().map(meta_from_dict).collect()
    }
}

fn meta_from_dict(dict: HashMap<String, OwnedValue>) -> ProviderResult<ResultMeta> {
    let fields = dict.into_iter().filter_map(|(key, value)| match &*value {
        Value::Str(text) => Some((key, text.as_str().to_string())),
        _ => {
            trace!("Ignoring non-string metadata field {key}");
            None
        }
    });
    ResultMeta::from_fields(fields)
}

fn meta_to_dict(meta: ResultMeta) -> HashMap<String, Value<'static>> {
    meta.into_fields()
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect()
}

const INTROSPECTION_DOCTYPE: &str = "<!DOCTYPE node PUBLIC \"-//freedesktop//DTD D-BUS Object Introspection 1.0//EN\"\n \"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n";

const SEARCH_PROVIDER_XML: &str = r#"  <interface name="org.gnome.Shell.SearchProvider2">
    <method name="GetInitialResultSet">
      <arg type="as" name="terms" direction="in"/>
      <arg type="as" name="results" direction="out"/>
    </method>
    <method name="GetSubsearchResultSet">
      <arg type="as" name="previous_results" direction="in"/>
      <arg type="as" name="terms" direction="in"/>
      <arg type="as" name="results" direction="out"/>
    </method>
    <method name="GetResultMetas">
      <arg type="as" name="identifiers" direction="in"/>
      <arg type="aa{sv}" name="metas" direction="out"/>
    </method>
    <method name="ActivateResult">
      <arg type="s" name="identifier" direction="in"/>
      <arg type="as" name="terms" direction="in"/>
      <arg type="u" name="timestamp" direction="in"/>
    </method>
    <method name="LaunchSearch">
      <arg type="as" name="terms" direction="in"/>
      <arg type="u" name="timestamp" direction="in"/>
    </method>
  </interface>
"#;

/// Introspection data for `object_path`, or `None` if nothing is served there.
fn introspection_xml(router: &ObjectRouter, object_path: &str) -> Option<String> {
    if object_path != router.base_path() {
        let node = object_path
            .strip_prefix(router.base_path())?
            .strip_prefix('/')?;
        if !router.introspect(Some(node)) || router.route(object_path).is_none() {
            return None;
        }
    }

    let mut xml = format!("{INTROSPECTION_DOCTYPE}<node>\n{SEARCH_PROVIDER_XML}");
    for child in router.enumerate(object_path) {
        xml.push_str(&format!("  <node name=\"{child}\"/>\n"));
    }
    xml.push_str("</node>\n");
    Some(xml)
}

/// Error reply for a call that could not be answered normally
struct ErrorReply {
    name: String,
    description: String,
}

impl ErrorReply {
    fn fdo(name: &str, description: String) -> Self {
        Self {
            name: format!("org.freedesktop.DBus.Error.{name}"),
            description,
        }
    }
}

impl From<ProviderError> for ErrorReply {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(_) => ErrorReply::fdo("UnknownObject", err.to_string()),
            _ => Self {
                name: format!("{PROVIDER_ERROR_PREFIX}.{}", err.error_name()),
                description: err.to_string(),
            },
        }
    }
}

fn message_interface_is(message: &Message, interface: &str) -> bool {
    message
        .interface()
        .is_some_and(|name| name.as_str() == interface)
}

fn decode_call(message: &Message) -> Result<MethodCall, ErrorReply> {
    let member = message
        .member()
        .map(|member| member.as_str().to_string())
        .unwrap_or_default();

    let invalid_args = |e: zbus::Error| ErrorReply::fdo("InvalidArgs", format!("{member}: {e}"));

    let call = match member.as_str() {
        "GetInitialResultSet" => {
            let terms: Vec<String> = message.body().map_err(invalid_args)?;
            MethodCall::GetInitialResultSet { terms }
        }
        "GetSubsearchResultSet" => {
            let (previous_results, terms): (Vec<String>, Vec<String>) =
                message.body().map_err(invalid_args)?;
            MethodCall::GetSubsearchResultSet {
                previous_results,
                terms,
            }
        }
        "GetResultMetas" => {
            let item_ids: Vec<String> = message.body().map_err(invalid_args)?;
            MethodCall::GetResultMetas { item_ids }
        }
        "LaunchSearch" => {
            let (terms, timestamp): (Vec<String>, u32) = message.body().map_err(invalid_args)?;
            MethodCall::LaunchSearch { terms, timestamp }
        }
        "ActivateResult" => {
            let (item_id, terms, timestamp): (String, Vec<String>, u32) =
                message.body().map_err(invalid_args)?;
            MethodCall::ActivateResult {
                item_id,
                terms,
                timestamp,
            }
        }
        _ => {
            return Err(ErrorReply::fdo(
                "UnknownMethod",
                format!("Unknown method {member}"),
            ))
        }
    };

    Ok(call)
}

async fn dispatch_message<B, L>(
    service: &SearchProviderService<B, L>,
    message: &Message,
) -> Result<MethodReply, ErrorReply>
where
    B: SearchBackend,
    L: Launcher,
{
    let object_path = message
        .path()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default();

    if !message_interface_is(message, SEARCH_PROVIDER_INTERFACE) {
        return Err(ErrorReply::fdo(
            "UnknownInterface",
            format!("{object_path} only implements {SEARCH_PROVIDER_INTERFACE}"),
        ));
    }

    let call = decode_call(message)?;
    service
        .handle_call(&object_path, call)
        .await
        .map_err(ErrorReply::from)
}

async fn handle_message<B, L>(
    connection: Connection,
    service: Arc<SearchProviderService<B, L>>,
    message: Arc<Message>,
) where
    B: SearchBackend,
    L: Launcher,
{
    if message_interface_is(&message, INTROSPECTABLE_INTERFACE) {
        let object_path = message
            .path()
            .map(|path| path.as_str().to_string())
            .unwrap_or_default();
        let sent = match introspection_xml(service.router(), &object_path) {
            Some(xml) => connection.reply(&message, &xml).await,
            None => {
                connection
                    .reply_error(
                        &message,
                        "org.freedesktop.DBus.Error.UnknownObject",
                        &format!("No search provider at {object_path}"),
                    )
                    .await
            }
        };
        if let Err(e) = sent {
            warn!("Failed to send introspection reply: {e}");
        }
        return;
    }

    let sent = match dispatch_message(&service, &message).await {
        Ok(MethodReply::ItemIds(item_ids)) => connection.reply(&message, &item_ids).await,
        Ok(MethodReply::Metas(metas)) => {
            let metas: Vec<HashMap<String, Value<'static>>> =
                metas.into_iter().map(meta_to_dict).collect();
            connection.reply(&message, &metas).await
        }
        Ok(MethodReply::Empty) => connection.reply(&message, &()).await,
        Err(error) => {
            debug!("Replying with {}: {}", error.name, error.description);
            connection
                .reply_error(&message, error.name.as_str(), &error.description)
                .await
        }
    };

    if let Err(e) = sent {
        warn!("Failed to send reply: {e}");
    }
}

/// Answer method calls on `connection` until `shutdown` is triggered.
pub async fn serve<B, L>(
    connection: Connection,
    service: Arc<SearchProviderService<B, L>>,
    shutdown: CancellationToken,
) where
    B: SearchBackend,
    L: Launcher,
{
    let mut stream = MessageStream::from(&connection);

    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received, stopping search provider");
                break;
            }
            message = stream.next() => message,
        };

        let message = match message {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                warn!("Failed to read message: {e}");
                continue;
            }
            None => {
                info!("Bus connection closed, stopping search provider");
                break;
            }
        };

        if message.message_type() != MessageType::MethodCall {
            continue;
        }

        tokio::spawn(handle_message(
            connection.clone(),
            Arc::clone(&service),
            message,
        ));
    }

    service.provider().shutdown();
}

async fn connect_bus(bus: BusType) -> zbus::Result<Connection> {
    match bus {
        BusType::Session => Connection::session().await,
        BusType::System => Connection::system().await,
    }
}

/// Connect to the bus, claim the provider name and serve until `shutdown`.
pub async fn run<L: Launcher>(
    config: &Config,
    launcher: Arc<L>,
    shutdown: CancellationToken,
) -> ProviderResult<()> {
    let connection = ConnectionBuilder::session()
        .map_err(|e| bus_error("Unable to open session bus", e))?
        .name(config.provider.bus_name.as_str())
        .map_err(|e| bus_error("Invalid provider bus name", e))?
        .build()
        .await
        .map_err(|e| bus_error("Unable to connect to session bus", e))?;

    let daemon_connection = match config.daemon.bus {
        BusType::Session => connection.clone(),
        bus => connect_bus(bus)
            .await
            .map_err(|e| bus_error("Unable to connect to daemon bus", e))?,
    };

    let backend = Arc::new(DaemonBackend::connect(&daemon_connection, &config.daemon).await?);
    let service = Arc::new(SearchProviderService::from_config(config, backend, launcher)?);

    info!(
        "Serving {} at {} as {}",
        SEARCH_PROVIDER_INTERFACE,
        service.router().base_path(),
        config.provider.bus_name
    );

    serve(connection, service, shutdown).await;
    Ok(())
}
