//! 内嵌 HTML 静态资源

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Dashboard</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: #1a1a2e;
            color: #eee;
            min-height: 100vh;
            padding: 20px;
        }
        .container {
            max-width: 720px;
            margin: 0 auto;
        }
        header {
            text-align: center;
            margin-bottom: 24px;
        }
        h1 {
            font-size: 24px;
            color: #00d4ff;
        }
        #version {
            font-size: 13px;
            color: #888;
        }
        .card {
            background: #16213e;
            border-radius: 8px;
            padding: 16px;
            margin-bottom: 16px;
        }
        .card h2 {
            font-size: 15px;
            color: #aaa;
            margin-bottom: 12px;
        }
        .readings {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 12px;
        }
        .reading {
            background: #0f3460;
            border-radius: 8px;
            padding: 12px;
        }
        .reading .label {
            font-size: 12px;
            color: #aaa;
            text-transform: uppercase;
        }
        .reading .value {
            font-size: 28px;
            font-weight: bold;
        }
        .reading .unit {
            font-size: 14px;
            color: #888;
            margin-left: 4px;
        }
        .badge {
            display: inline-block;
            padding: 2px 10px;
            border-radius: 12px;
            font-size: 12px;
            font-weight: bold;
        }
        .on { background: #1e4d2b; color: #4ade80; }
        .off { background: #4d1e1e; color: #f87171; }
        .button-group {
            display: flex;
            flex-wrap: wrap;
            gap: 12px;
            margin-top: 12px;
        }
        button {
            flex: 1;
            min-width: 140px;
            padding: 12px;
            border: none;
            border-radius: 8px;
            font-size: 15px;
            cursor: pointer;
            min-height: 44px;
        }
        .btn-on { background: #00d4ff; color: #1a1a2e; font-weight: bold; }
        .btn-off { background: #0f3460; color: #00d4ff; }
        .btn-warn { background: #f59e0b; color: #1a1a2e; }
        .btn-danger { background: #b91c1c; color: #fff; }
        select {
            width: 100%;
            padding: 12px;
            border: 1px solid #333;
            border-radius: 8px;
            background: #0f3460;
            color: #fff;
            font-size: 15px;
        }
        footer {
            text-align: center;
            font-size: 12px;
            color: #888;
            margin-top: 8px;
        }
        .hidden { display: none; }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1 id="name">Dashboard</h1>
            <div id="version">-</div>
        </header>

        <div class="card" id="sensors-card">
            <h2>Sensors</h2>
            <div class="readings" id="readings"></div>
        </div>

        <div class="card hidden" id="output1-card">
            <h2><span id="output1-label">Output 1</span> <span class="badge off" id="output1-state">OFF</span></h2>
            <div class="button-group">
                <button class="btn-on" onclick="setOutput(1, true)">Turn on</button>
                <button class="btn-off" onclick="setOutput(1, false)">Turn off</button>
            </div>
        </div>

        <div class="card hidden" id="output2-card">
            <h2><span id="output2-label">Output 2</span> <span class="badge off" id="output2-state">OFF</span></h2>
            <div class="button-group">
                <button class="btn-on" onclick="setOutput(2, true)">Turn on</button>
                <button class="btn-off" onclick="setOutput(2, false)">Turn off</button>
            </div>
        </div>

        <div class="card">
            <h2>Mode: <span id="mode">-</span></h2>
            <select id="mode-select" onchange="setMode(this.value)">
                <option value="auto">Automatic</option>
                <option value="manual">Manual</option>
                <option value="sleep">Sleep</option>
            </select>
        </div>

        <div class="card">
            <h2>System</h2>
            <div class="button-group">
                <button class="btn-off" onclick="refresh()">Refresh</button>
                <button class="btn-warn" onclick="customAction()">Blink LED</button>
                <button class="btn-danger" onclick="resetDevice()">Restart</button>
            </div>
        </div>

        <footer>
            <span id="host"></span> | Uptime: <span id="uptime">0</span>s
        </footer>
    </div>

    <script>
        document.getElementById('host').textContent = location.host;

        function text(id, value) {
            document.getElementById(id).textContent = value;
        }

        function renderSensors(sensors) {
            const card = document.getElementById('sensors-card');
            const box = document.getElementById('readings');
            if (!sensors) {
                card.classList.add('hidden');
                return;
            }
            card.classList.remove('hidden');
            box.replaceChildren();
            for (const i of [1, 2, 3]) {
                if (!sensors['show' + i]) continue;
                const item = document.createElement('div');
                item.className = 'reading';
                const label = document.createElement('div');
                label.className = 'label';
                label.textContent = sensors['label' + i];
                const value = document.createElement('span');
                value.className = 'value';
                value.textContent = Number(sensors['value' + i]).toFixed(1);
                const unit = document.createElement('span');
                unit.className = 'unit';
                unit.textContent = sensors['unit' + i];
                item.append(label, value, unit);
                box.append(item);
            }
        }

        function renderOutput(i, outputs) {
            const card = document.getElementById('output' + i + '-card');
            if (!outputs || !outputs['show' + i]) {
                card.classList.add('hidden');
                return;
            }
            card.classList.remove('hidden');
            const on = outputs['output' + i];
            const badge = document.getElementById('output' + i + '-state');
            text('output' + i + '-label', outputs['label' + i] || ('Output ' + i));
            badge.textContent = on ? 'ON' : 'OFF';
            badge.className = 'badge ' + (on ? 'on' : 'off');
        }

        function renderSystem(system) {
            if (!system) return;
            text('name', system.name || 'Dashboard');
            text('version', system.version || '-');
            text('mode', system.mode || '-');
            text('uptime', system.uptime || 0);
            document.getElementById('mode-select').value = system.mode;
            document.title = system.name || 'Dashboard';
        }

        async function refresh() {
            try {
                const resp = await fetch('/api/status');
                const data = await resp.json();
                renderSensors(data.sensors);
                renderOutput(1, data.outputs);
                renderOutput(2, data.outputs);
                renderSystem(data.system);
            } catch (e) {
                console.error('Failed to load status:', e);
            }
        }

        async function call(url) {
            try {
                const resp = await fetch(url);
                const data = await resp.json();
                if (!resp.ok) console.warn(url, data.error);
                return data;
            } catch (e) {
                console.error(url, e);
                return {};
            }
        }

        async function setOutput(i, on) {
            const data = await call('/api/output' + i + '?state=' + (on ? '1' : '0'));
            if (data.success) refresh();
        }

        async function setMode(mode) {
            const data = await call('/api/mode?mode=' + encodeURIComponent(mode));
            if (data.success) refresh();
        }

        async function customAction() {
            const data = await call('/api/custom');
            if (data.message) console.log(data.message);
            refresh();
        }

        async function resetDevice() {
            if (!confirm('Restart the device?')) return;
            await call('/api/reset');
            alert('Restarting...');
            setTimeout(() => location.reload(), 3000);
        }

        refresh();
        setInterval(refresh, 2000);
    </script>
</body>
</html>"#;
