//! SoftAP + HTTP 服务器
//!
//! 设备自建热点（192.168.4.1/24，开启 DHCP），由 ESP-IDF 的 httpd 任务接收请求，
//! 再通过通道交给主循环里的 `Dashboard::poll` 处理。

use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    http::{
        server::{Configuration, EspHttpConnection, EspHttpServer, Request},
        Method,
    },
    io::Write,
    ipv4::{self, Mask, Subnet},
    netif::{EspNetif, NetifConfiguration, NetifStack},
    wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration as WifiConfig, EspWifi,
        WifiDriver,
    },
};

use super::{PendingRequest, RequestTx, Response, Transport};
use crate::config::{ApConfig, AP_GATEWAY, AP_IP, AP_NETMASK_BITS, HTTP_PORT};

pub struct SoftApPortal {
    modem: Option<Modem>,
    sysloop: EspSystemEventLoop,
    _wifi: Option<BlockingWifi<EspWifi<'static>>>,
    _server: Option<EspHttpServer<'static>>,
}

impl SoftApPortal {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Self {
        Self {
            modem: Some(modem),
            sysloop,
            _wifi: None,
            _server: None,
        }
    }

    fn start_ap(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        config: &ApConfig,
    ) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
        // 固定 IP 192.168.4.1，客户端地址由 DHCP 分配
        let ap_netif_config = NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(ipv4::RouterConfiguration {
                subnet: Subnet {
                    gateway: AP_GATEWAY.octets().into(),
                    mask: Mask(AP_NETMASK_BITS),
                },
                dhcp_enabled: true,
                dns: Some(AP_IP.octets().into()),
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        };
        let ap_netif = EspNetif::new_with_conf(&ap_netif_config)?;

        let driver = WifiDriver::new(modem, sysloop.clone(), None)?;

        // AP 模式不使用 STA，但 wrap_all 需要
        let sta_netif = EspNetif::new(NetifStack::Sta)?;

        let mut wifi = BlockingWifi::wrap(
            EspWifi::wrap_all(driver, sta_netif, ap_netif)?,
            sysloop,
        )?;

        let auth_method = if config.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let ap_config = AccessPointConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow::anyhow!("ssid too long: {}", config.ssid))?,
            ssid_hidden: false,
            channel: config.channel,
            auth_method,
            password: config
                .pass
                .as_str()
                .try_into()
                .map_err(|_| anyhow::anyhow!("passphrase too long"))?,
            max_connections: config.max_connections,
            ..Default::default()
        };

        wifi.set_configuration(&WifiConfig::AccessPoint(ap_config))?;
        wifi.start()?;

        Ok(wifi)
    }

    fn start_http_server(
        paths: &[&'static str],
        requests: RequestTx,
    ) -> anyhow::Result<EspHttpServer<'static>> {
        let config = Configuration {
            http_port: HTTP_PORT,
            stack_size: 8192,
            max_uri_handlers: 12,
            ..Default::default()
        };

        let mut server = EspHttpServer::new(&config)?;

        for &path in paths {
            let requests = requests.clone();
            server.fn_handler::<anyhow::Error, _>(path, Method::Get, move |req| {
                forward(req, &requests)
            })?;
        }

        Ok(server)
    }
}

impl Transport for SoftApPortal {
    fn serve(
        &mut self,
        config: &ApConfig,
        paths: &[&'static str],
        requests: RequestTx,
    ) -> anyhow::Result<()> {
        let modem = self
            .modem
            .take()
            .ok_or_else(|| anyhow::anyhow!("SoftAP already started"))?;

        let wifi = Self::start_ap(modem, self.sysloop.clone(), config)?;
        log::info!("SoftAP started: {}", config.ssid);

        let server = Self::start_http_server(paths, requests)?;
        log::info!("HTTP server started on {}:{}", AP_IP, HTTP_PORT);

        self._wifi = Some(wifi);
        self._server = Some(server);
        Ok(())
    }

    fn url(&self) -> String {
        format!("http://{}", AP_IP)
    }

    fn restart(&mut self) {
        unsafe { esp_idf_svc::sys::esp_restart() }
    }
}

/// Runs on the httpd task: hands the request to the poll loop and blocks
/// until the reply comes back.
fn forward(req: Request<&mut EspHttpConnection<'_>>, requests: &RequestTx) -> anyhow::Result<()> {
    let request = super::Request::get(req.uri())?;
    log::debug!("GET {}", req.uri());

    let (pending, reply) = PendingRequest::new(request);
    let response = match requests.blocking_send(pending) {
        Ok(()) => reply.blocking_recv().unwrap_or_else(|_| Response::unavailable()),
        Err(_) => Response::unavailable(),
    };

    let mut resp = req.into_response(
        response.status.as_u16(),
        response.status.canonical_reason(),
        &[("Content-Type", response.content_type)],
    )?;
    resp.write_all(&response.body)?;
    Ok(())
}
